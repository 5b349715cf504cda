//! WebSocket message dispatch
//!
//! Every client message is routed to the matching room operation. Failures
//! are turned into `error` messages here; nothing propagates past this point.

use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{normalize_code, AppState};
use std::sync::Arc;

use super::Connection;

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            target_score,
            game_type,
        } => {
            leave_current_room(conn, state, None).await;
            match state
                .create_room(&conn.id, &player_name, target_score, game_type)
                .await
            {
                Ok((room, events)) => {
                    let room_code = room.code.clone();
                    conn.attach(room.code, events);
                    Some(ServerMessage::RoomCreated { room_code })
                }
                Err(e) => Some(reply_error(e)),
            }
        }

        ClientMessage::JoinRoom {
            room_code,
            player_name,
        } => {
            let code = normalize_code(&room_code);
            leave_current_room(conn, state, Some(&code)).await;
            match state.join_room(&conn.id, &code, &player_name).await {
                Ok((room, events)) => {
                    conn.attach(room.code.clone(), events);
                    Some(ServerMessage::JoinedRoom {
                        room_code: room.code,
                        game_type: room.game_type,
                    })
                }
                Err(e) => Some(reply_error(e)),
            }
        }

        ClientMessage::StartGame { room_code } => {
            respond(state.start_game(&conn.id, &room_code).await)
        }

        ClientMessage::SubmitSelection {
            room_code,
            selection,
        } => respond(
            state
                .submit_selection(&conn.id, &room_code, selection)
                .await,
        ),

        ClientMessage::RequestNextRound { room_code } => {
            respond(state.request_next_round(&conn.id, &room_code).await)
        }

        ClientMessage::ResetGame { room_code } => {
            respond(state.reset_room(&conn.id, &room_code).await)
        }
    }
}

/// Switching rooms detaches from the previous one first
async fn leave_current_room(conn: &mut Connection, state: &Arc<AppState>, next: Option<&str>) {
    if conn.room.as_deref() == next && next.is_some() {
        return;
    }
    if let Some(code) = conn.room.take() {
        conn.events = None;
        state.leave_room(&conn.id, &code).await;
    }
}

/// Successful operations answer through room broadcasts only
fn respond(result: GameResult<()>) -> Option<ServerMessage> {
    match result {
        Ok(()) => None,
        Err(e) => {
            if e.is_room_wide() {
                // Already broadcast to the whole room
                None
            } else {
                Some(reply_error(e))
            }
        }
    }
}

fn reply_error(e: GameError) -> ServerMessage {
    match &e {
        GameError::Persistence(_) => tracing::error!("{}", e),
        _ => tracing::debug!("Request refused: {}", e),
    }
    e.to_message()
}
