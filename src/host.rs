// 🤖 Local Host - a bridge whose other end is the bot itself
// `send_data` goes straight to parsing + storage, replies are collected
// the way a chat would show them.

use crate::bridge::WebAppBridge;
use crate::db::add_cashback;
use crate::webapp_data::{confirmation_message, parse_payload, CashbackEntry};
use anyhow::Result;
use rusqlite::Connection;
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// Popup shown inside the Mini App
    Alert(String),
    /// Bot reply in the chat
    Reply(String),
    /// Payload the bot could not accept
    Rejected(String),
}

pub struct LocalHost<'a> {
    conn: &'a Connection,
    user_id: i64,
    messages: RefCell<Vec<HostMessage>>,
}

impl<'a> LocalHost<'a> {
    pub fn new(conn: &'a Connection, user_id: i64) -> Self {
        LocalHost {
            conn,
            user_id,
            messages: RefCell::new(Vec::new()),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }

    /// Drain messages produced since the last call
    pub fn take_messages(&self) -> Vec<HostMessage> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }

    fn deliver(&self, payload: &str) -> Result<String> {
        let submission = parse_payload(payload)?;
        let entry = CashbackEntry::from_submission(&submission)?;
        add_cashback(self.conn, self.user_id, &entry)?;
        Ok(confirmation_message(&entry))
    }

    fn push(&self, message: HostMessage) {
        self.messages.borrow_mut().push(message);
    }
}

impl WebAppBridge for LocalHost<'_> {
    // Nothing to resize or restyle in a local session
    fn expand(&self) {}

    fn set_main_button_text_color(&self, _color: &str) {}

    fn set_main_button_color(&self, _color: &str) {}

    fn show_alert(&self, message: &str) {
        self.push(HostMessage::Alert(message.to_string()));
    }

    fn send_data(&self, payload: &str) {
        match self.deliver(payload) {
            Ok(reply) => self.push(HostMessage::Reply(reply)),
            Err(e) => {
                tracing::warn!(user_id = self.user_id, "Rejected web app data: {:#}", e);
                self.push(HostMessage::Rejected(format!("{:#}", e)));
            }
        }
    }
}
