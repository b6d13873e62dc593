//! Model delivery
//!
//! The only output of a sync pass: a sequence of models handed to a
//! [`BuildModelConsumer`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::IdeAndroidSyncError;
use crate::module::{JavaModule, NativeVariantsAndroidModule, SyncedAndroidModule};
use crate::protocol::{IdeaProject, ProjectIdentifier};

/// What a delivered model belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryTarget {
    Build { root_dir: PathBuf },
    Project(ProjectIdentifier),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", content = "value", rename_all = "snake_case")]
pub enum DeliveredModel {
    IdeaProject(IdeaProject),
    AndroidModule(Box<SyncedAndroidModule>),
    JavaModule(JavaModule),
    NativeVariantsModule(NativeVariantsAndroidModule),
    SyncError(IdeAndroidSyncError),
}

impl DeliveredModel {
    pub fn model_name(&self) -> &'static str {
        match self {
            DeliveredModel::IdeaProject(_) => "IdeaProject",
            DeliveredModel::AndroidModule(_) => "AndroidModule",
            DeliveredModel::JavaModule(_) => "JavaModule",
            DeliveredModel::NativeVariantsModule(_) => "NativeVariantsAndroidModule",
            DeliveredModel::SyncError(_) => "IdeAndroidSyncError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub target: DeliveryTarget,
    #[serde(flatten)]
    pub model: DeliveredModel,
}

/// Sink for the models of a sync pass
pub trait BuildModelConsumer {
    fn consume(&mut self, target: DeliveryTarget, model: DeliveredModel);
}

impl BuildModelConsumer for Vec<Delivery> {
    fn consume(&mut self, target: DeliveryTarget, model: DeliveredModel) {
        self.push(Delivery { target, model });
    }
}
