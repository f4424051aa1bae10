use std::sync::Arc;

use application::{
    AdmissionController, MessageStore, ModerationFanout, PublishPipeline, SessionRegistry,
    UserDirectory,
};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub publisher: Arc<PublishPipeline>,
    pub moderation: Arc<ModerationFanout>,
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn MessageStore>,
    pub directory: Arc<dyn UserDirectory>,
    pub jwt: Arc<JwtService>,
}
