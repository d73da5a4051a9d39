//! # Matrix Transport Adapter
//!
//! Implements the `ChatTransport` trait for the Matrix protocol using the `matrix_sdk`.
//! This module acts as the bridge between the destination strings the engine
//! produces and the rooms the Matrix SDK can send to.

use crate::domain::traits::ChatTransport;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use matrix_sdk::Client;
use matrix_sdk::room::Room;
use matrix_sdk::ruma::events::room::message::RoomMessageEventContent;
use matrix_sdk::ruma::{OwnedUserId, RoomId, UserId};

#[derive(Clone)]
pub struct MatrixTransport {
    client: Client,
}

impl MatrixTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolves a destination to a room.
    ///
    /// `!room:server` is a joined room, `@user:server` a direct chat (created
    /// on first use), and a bare name a user on our own homeserver.
    async fn resolve(&self, destination: &str) -> Result<Room> {
        if destination.starts_with('!') {
            let room_id = <&RoomId>::try_from(destination)
                .with_context(|| format!("invalid room id {destination}"))?;
            return self
                .client
                .get_room(room_id)
                .ok_or_else(|| anyhow!("not joined to room {destination}"));
        }

        let user_id = self.user_id_for(destination)?;
        if let Some(room) = self.client.get_dm_room(&user_id) {
            return Ok(room);
        }
        tracing::info!("Opening direct chat with {}", user_id);
        self.client
            .create_dm(&user_id)
            .await
            .with_context(|| format!("failed to open direct chat with {user_id}"))
    }

    fn user_id_for(&self, destination: &str) -> Result<OwnedUserId> {
        if destination.starts_with('@') {
            return UserId::parse(destination).with_context(|| format!("invalid user id {destination}"));
        }
        let own = self
            .client
            .user_id()
            .ok_or_else(|| anyhow!("not logged in"))?;
        UserId::parse(format!("@{}:{}", destination, own.server_name()))
            .with_context(|| format!("cannot address {destination}"))
    }
}

#[async_trait]
impl ChatTransport for MatrixTransport {
    async fn send(&self, destination: &str, line: &str) -> Result<()> {
        let room = self.resolve(destination).await?;
        tracing::info!("Bot sending message to {}: {}", room.room_id(), line);
        room.send(RoomMessageEventContent::text_plain(line)).await?;
        Ok(())
    }
}
