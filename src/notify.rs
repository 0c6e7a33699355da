//!
//! # Notifications
//!
//! Best-effort email sent when a todo is created. Delivery goes through the
//! `Mailer` trait so the SMTP transport can be swapped for a logging or
//! recording implementation. `Notifier::todo_created` never returns an error:
//! whatever goes wrong is logged and dropped, and the todo stays created.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::auth::Identity;
use crate::config::MailConfig;
use crate::error::AppError;
use crate::store::UserStore;

pub const TODO_CREATED_SUBJECT: &str = "New Todo Created!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// The notification for a freshly created todo.
    pub fn todo_created(to: &str, title: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: TODO_CREATED_SUBJECT.to_string(),
            body: format!("You have created a new todo: {}", title),
        }
    }
}

#[derive(Debug)]
pub enum MailError {
    Address(String),
    Build(String),
    Transport(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MailError::Address(msg) => write!(f, "Invalid address: {}", msg),
            MailError::Build(msg) => write!(f, "Cannot build message: {}", msg),
            MailError::Transport(msg) => write!(f, "Delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for MailError {}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Delivers through an SMTP relay using STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let sender: Mailbox = config
            .default_sender
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Used when no mail server is configured: writes the message to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        log::info!(
            "Mail delivery disabled; to={} subject={:?} body={:?}",
            email.to,
            email.subject,
            email.body
        );
        Ok(())
    }
}

pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    users: UserStore,
    anonymous_email: String,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        users: UserStore,
        anonymous_email: String,
        timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            users,
            anonymous_email,
            timeout,
        }
    }

    /// Where notifications for `identity` go.
    pub async fn recipient_for(&self, identity: &Identity) -> Result<Option<String>, AppError> {
        match identity {
            Identity::Anonymous => Ok(Some(self.anonymous_email.clone())),
            Identity::External { email, .. } => Ok(email.clone()),
            Identity::Local { user_id } => self.users.email_for(*user_id).await,
        }
    }

    pub async fn todo_created(&self, identity: &Identity, title: &str) {
        let recipient = match self.recipient_for(identity).await {
            Ok(Some(recipient)) => recipient,
            Ok(None) => {
                log::warn!(
                    "No email address for {}; skipping notification",
                    identity.owner_key()
                );
                return;
            }
            Err(e) => {
                log::error!("Error resolving notification recipient: {}", e);
                return;
            }
        };

        let email = Email::todo_created(&recipient, title);
        match tokio::time::timeout(self.timeout, self.mailer.send(email)).await {
            Ok(Ok(())) => log::info!("Email sent to {}", recipient),
            Ok(Err(e)) => log::error!("Error sending email: {}", e),
            Err(_) => log::error!(
                "Error sending email: timed out after {}s",
                self.timeout.as_secs()
            ),
        }
    }
}
