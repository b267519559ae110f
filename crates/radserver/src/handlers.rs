use crate::config::User;
use crate::handler::{Handler, ResponseWriter};
use async_trait::async_trait;
use radserver_proto::{Attribute, AttributeType, Code, Packet};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
struct UserEntry {
    password: String,
    reply_message: Option<String>,
    attributes: BTreeMap<String, String>,
}

/// PAP authentication against an in-memory user table
///
/// Access-Request packets with matching credentials get an Access-Accept
/// carrying the user's Reply-Message and configured attributes; everything
/// else gets an Access-Reject. Other packet codes are ignored.
#[derive(Debug, Default)]
pub struct UserTableHandler {
    users: HashMap<String, UserEntry>,
}

impl UserTableHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: &[User]) -> Self {
        let mut handler = UserTableHandler::new();
        for user in users {
            handler.users.insert(
                user.username.clone(),
                UserEntry {
                    password: user.password.clone(),
                    reply_message: user.reply_message.clone(),
                    attributes: user.attributes.clone(),
                },
            );
        }
        handler
    }

    pub fn add_user(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.users.insert(
            username.into(),
            UserEntry {
                password: password.into(),
                ..Default::default()
            },
        );
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn authenticate(&self, username: &str, password: &str) -> Option<&UserEntry> {
        self.users
            .get(username)
            .filter(|entry| entry.password == password)
    }

    fn accept_attributes(&self, entry: &UserEntry, packet: &Packet) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        if let Some(ref message) = entry.reply_message {
            attributes.push(Attribute::string(
                AttributeType::ReplyMessage.as_u8(),
                message.as_str(),
            ));
        }

        for (name, value) in &entry.attributes {
            match packet.dictionary.attr(name, value.as_str()) {
                Ok(attr) => attributes.push(attr),
                Err(e) => warn!(attribute = %name, error = %e, "Skipping reply attribute"),
            }
        }
        attributes
    }
}

#[async_trait]
impl Handler for UserTableHandler {
    async fn serve_radius(&self, writer: ResponseWriter, packet: Packet) {
        if packet.code != Code::AccessRequest {
            debug!(
                request_type = %packet.code,
                client_addr = %writer.remote_addr(),
                "Ignoring non-authentication request"
            );
            return;
        }

        let Some((username, password)) = packet.pap() else {
            debug!(
                client_addr = %writer.remote_addr(),
                request_id = packet.identifier,
                "Access-Request without PAP credentials"
            );
            if let Err(e) = writer.access_reject(Vec::new()).await {
                warn!(error = %e, "Failed to send Access-Reject");
            }
            return;
        };

        let result = match self.authenticate(&username, &password) {
            Some(entry) => {
                info!(
                    username = %username,
                    client_addr = %writer.remote_addr(),
                    "Authentication successful"
                );
                writer
                    .access_accept(self.accept_attributes(entry, &packet))
                    .await
            }
            None => {
                info!(
                    username = %username,
                    client_addr = %writer.remote_addr(),
                    "Authentication failed"
                );
                writer
                    .access_reject(vec![Attribute::string(
                        AttributeType::ReplyMessage.as_u8(),
                        "Authentication failed",
                    )])
                    .await
            }
        };

        if let Err(e) = result {
            warn!(username = %username, error = %e, "Failed to send response");
        }
    }
}

/// Logs Accounting-Request attributes and acknowledges them
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountingLogger;

#[async_trait]
impl Handler for AccountingLogger {
    async fn serve_radius(&self, writer: ResponseWriter, packet: Packet) {
        if packet.code != Code::AccountingRequest {
            debug!(
                request_type = %packet.code,
                client_addr = %writer.remote_addr(),
                "Ignoring non-accounting request"
            );
            return;
        }

        for attr in &packet.attributes {
            let name = packet
                .dictionary
                .name(attr.attr_type)
                .unwrap_or_else(|| format!("Attr-{}", attr.attr_type));
            info!(
                client_addr = %writer.remote_addr(),
                request_id = packet.identifier,
                attribute = %name,
                value = %attr.value,
                "Accounting attribute"
            );
        }

        let reply = vec![Attribute::string(
            AttributeType::ReplyMessage.as_u8(),
            "Done",
        )];
        if let Err(e) = writer.accounting_response(reply).await {
            warn!(error = %e, "Failed to send Accounting-Response");
        }
    }
}
