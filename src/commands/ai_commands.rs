use crate::models::ai::AiStatusDto;

use super::{AppState, CommandResult};

pub async fn ai_status(state: &AppState) -> CommandResult<AiStatusDto> {
    Ok(state.generator().status().await?)
}
