use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;

use super::rooms::SharedRoom;
use super::{Peer, ServerState};
use crate::network::protocol::{parse_command, ClientCommand, GameCommand, MessageBody, ServerMessage};
use crate::network::{encode_frame, FrameDecoder};

pub const MSG_MALFORMED: &str = "Error: malformed message";
pub const MSG_TOO_LONG: &str = "Error: message too long";
pub const MSG_NO_ROOMS: &str = "No Room created";
pub const MSG_NOT_IN_ROOM: &str = "You aren't in a room";
pub const MSG_LEFT_ROOM: &str = "You left the room";

/// How long queued replies may take to flush once the connection is done.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-connection state: the outbound handle and the room the connection
/// is bound to, as player or spectator.
struct Session {
    peer: Peer,
    room: Option<SharedRoom>,
}

impl Session {
    fn reply(&self, text: impl Into<String>) {
        self.peer.send(ServerMessage::text(text));
    }

    /// Detaches from the bound room, if any. Returns whether the connection
    /// was still a member.
    async fn leave_room(&mut self) -> bool {
        let Some(room) = self.room.take() else {
            return false;
        };
        let left = room.lock().await.leave(self.peer.id());
        left
    }

    async fn dispatch(&mut self, state: &ServerState, frame: &[u8]) {
        let cmd = match parse_command(frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!("[client] [malformed] conn={} err={}", self.peer.id(), e);
                self.reply(MSG_MALFORMED);
                return;
            }
        };
        tracing::debug!("[client] [command] conn={} cmd={:?}", self.peer.id(), cmd);

        match cmd {
            ClientCommand::Create { payload: name } => match state.registry.create(&name).await {
                Ok(_) => self.reply(format!("{} created", name)),
                Err(e) => self.reply(e.to_string()),
            },
            ClientCommand::Join { payload: name } => self.join(state, &name).await,
            ClientCommand::Spectate { payload: name } => self.spectate(state, &name).await,
            ClientCommand::GetRooms => {
                let rooms = state.registry.list_rooms().await;
                if rooms.is_empty() {
                    self.reply(MSG_NO_ROOMS);
                } else {
                    self.peer.send(ServerMessage::Message {
                        payload: MessageBody::Rooms(rooms),
                    });
                }
            }
            ClientCommand::LeaveRoom => {
                if self.leave_room().await {
                    self.reply(MSG_LEFT_ROOM);
                } else {
                    self.reply(MSG_NOT_IN_ROOM);
                }
            }
            ClientCommand::DeleteRoom { payload: name } => match state.registry.delete(&name).await {
                Ok(()) => self.reply(format!("{} deleted", name)),
                Err(e) => self.reply(e.to_string()),
            },
            ClientCommand::Game(cmd) => self.game(cmd).await,
        }
    }

    async fn join(&mut self, state: &ServerState, name: &str) {
        // the old seat is released even if the new join fails
        self.leave_room().await;
        match state.registry.join(name, self.peer.clone()).await {
            Ok((room, _color)) => {
                self.room = Some(room);
                self.reply(format!("Joined {}", name));
            }
            Err(e) => {
                tracing::warn!("[client] [join_failed] conn={} room={} err={}", self.peer.id(), name, e);
                self.reply(e.to_string());
            }
        }
    }

    async fn spectate(&mut self, state: &ServerState, name: &str) {
        self.leave_room().await;
        match state.registry.spectate(name, self.peer.clone()).await {
            Ok(room) => {
                self.room = Some(room);
                self.reply(format!("Spectating {}", name));
            }
            Err(e) => self.reply(e.to_string()),
        }
    }

    async fn game(&mut self, cmd: GameCommand) {
        let Some(room) = self.room.clone() else {
            self.reply(MSG_NOT_IN_ROOM);
            return;
        };
        let mut room = room.lock().await;
        if room.is_closed() {
            drop(room);
            self.room = None;
            self.reply(MSG_NOT_IN_ROOM);
            return;
        }
        room.handle_game_command(&self.peer, cmd);
    }
}

pub async fn handle_client(state: Arc<ServerState>, stream: TcpStream, conn_id: u64) {
    let (mut reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let frame = match encode_frame(&msg) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("[client] [encode_failed] conn={} err={}", conn_id, e);
                    continue;
                }
            };
            if let Err(e) = writer.write_all(&frame).await {
                tracing::debug!("[client] [write_failed] conn={} err={}", conn_id, e);
                break;
            }
        }
    });

    let mut session = Session {
        peer: Peer::new(conn_id, tx),
        room: None,
    };
    let mut decoder = FrameDecoder::new(state.config.max_frame_len);
    let mut chunk = vec![0u8; state.config.read_buffer_size];
    let poll_interval = state.config.poll_interval();

    loop {
        if state.shutdown_requested() {
            tracing::debug!("[client] [shutdown] conn={}", conn_id);
            break;
        }

        let n = match time::timeout(poll_interval, reader.read(&mut chunk)).await {
            Err(_) => continue,
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::debug!("[client] [read_failed] conn={} err={}", conn_id, e);
                break;
            }
        };
        decoder.extend(&chunk[..n]);

        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => session.dispatch(&state, &frame).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("[client] [frame_rejected] conn={} err={}", conn_id, e);
                    session.reply(MSG_TOO_LONG);
                    break;
                }
            }
        }
    }

    session.leave_room().await;
    // last sender; the writer ends once the queue is flushed
    drop(session);
    if time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await.is_err() {
        tracing::debug!("[client] [drain_timeout] conn={}", conn_id);
        writer_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::game::Color;
    use crate::network::protocol::GameEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn session(id: u64) -> (Session, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session { peer: Peer::new(id, tx), room: None }, rx)
    }

    fn texts(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::Message { payload: MessageBody::Text(text) } = msg {
                out.push(text);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_lobby_replies() {
        let state = ServerState::new(ServerConfig::default());
        let (mut s, mut rx) = session(1);

        s.dispatch(&state, br#"{"action":"get_rooms"}"#).await;
        s.dispatch(&state, br#"{"action":"create","payload":"r1"}"#).await;
        s.dispatch(&state, br#"{"action":"create","payload":"r1"}"#).await;
        s.dispatch(&state, br#"{"action":"leave_room"}"#).await;
        s.dispatch(&state, br#"{"action":"join","payload":"r2"}"#).await;
        s.dispatch(&state, b"{oops").await;

        assert_eq!(
            texts(&mut rx),
            [
                MSG_NO_ROOMS,
                "r1 created",
                "Error: Room name is already taken",
                MSG_NOT_IN_ROOM,
                "Error: Room not found",
                MSG_MALFORMED,
            ]
        );
    }

    #[tokio::test]
    async fn test_get_rooms_lists_names() {
        let state = ServerState::new(ServerConfig::default());
        let (mut s, mut rx) = session(1);
        state.registry.create("b").await.unwrap();
        state.registry.create("a").await.unwrap();

        s.dispatch(&state, br#"{"action":"get_rooms"}"#).await;
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Message { payload: MessageBody::Rooms(vec!["a".into(), "b".into()]) }
        );
    }

    #[tokio::test]
    async fn test_join_moves_between_rooms() {
        let state = ServerState::new(ServerConfig::default());
        let (mut s, mut rx) = session(1);
        state.registry.create("r1").await.unwrap();
        state.registry.create("r2").await.unwrap();

        s.dispatch(&state, br#"{"action":"join","payload":"r1"}"#).await;
        s.dispatch(&state, br#"{"action":"join","payload":"r2"}"#).await;

        let r1 = state.registry.get("r1").await.unwrap();
        assert_eq!(r1.lock().await.seat_of(1), None);
        let r2 = state.registry.get("r2").await.unwrap();
        assert_eq!(r2.lock().await.seat_of(1), Some(Color::White));
        assert_eq!(texts(&mut rx), ["Joined r1", "Joined r2"]);
    }

    #[tokio::test]
    async fn test_game_command_outside_room() {
        let state = ServerState::new(ServerConfig::default());
        let (mut s, mut rx) = session(1);
        s.dispatch(&state, br#"{"action":"game","sub_action":"undo_move"}"#).await;
        assert_eq!(texts(&mut rx), [MSG_NOT_IN_ROOM]);
    }

    #[tokio::test]
    async fn test_deleted_room_unbinds_members() {
        let state = ServerState::new(ServerConfig::default());
        let (mut white, mut white_rx) = session(1);
        let (mut black, mut black_rx) = session(2);
        state.registry.create("r1").await.unwrap();
        white.dispatch(&state, br#"{"action":"join","payload":"r1"}"#).await;
        black.dispatch(&state, br#"{"action":"join","payload":"r1"}"#).await;
        texts(&mut white_rx);

        black.dispatch(&state, br#"{"action":"delete_room","payload":"r1"}"#).await;
        assert!(state.registry.is_empty().await);
        assert_eq!(texts(&mut white_rx), ["Room r1 was deleted"]);

        white.dispatch(&state, br#"{"action":"game","sub_action":"update"}"#).await;
        assert_eq!(texts(&mut white_rx), [MSG_NOT_IN_ROOM]);
        assert!(white.room.is_none());

        let black_texts = texts(&mut black_rx);
        assert!(black_texts.ends_with(&["Room r1 was deleted".to_string(), "r1 deleted".to_string()]));
    }

    #[tokio::test]
    async fn test_update_request_rebroadcasts_state() {
        let state = ServerState::new(ServerConfig::default());
        let (mut white, mut white_rx) = session(1);
        let (mut black, _black_rx) = session(2);
        state.registry.create("r1").await.unwrap();
        white.dispatch(&state, br#"{"action":"join","payload":"r1"}"#).await;
        black.dispatch(&state, br#"{"action":"join","payload":"r1"}"#).await;
        while white_rx.try_recv().is_ok() {}

        white.dispatch(&state, br#"{"action":"game","sub_action":"update"}"#).await;
        assert!(matches!(
            white_rx.try_recv().unwrap(),
            ServerMessage::Game(GameEvent::Update { .. })
        ));
    }
}
