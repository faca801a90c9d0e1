//! `users` command: thin client for the user routes

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::Deserialize;
use serde_json::Value;

use tally_core::User;

/// User management actions
#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List all users
    List,
    /// Create a user
    Add {
        /// Display name
        name: String,
        /// Email address
        email: String,
    },
    /// Change a user's name and email
    Update {
        /// User ID
        id: i64,
        /// New name
        name: String,
        /// New email
        email: String,
    },
    /// Delete a user
    Remove {
        /// User ID
        id: i64,
    },
}

#[derive(Debug, Deserialize)]
struct UsersBody {
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    user: User,
}

/// HTTP client for `/users`
pub struct UsersClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl UsersClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// All users ordered by name
    pub async fn list(&self) -> Result<Vec<User>> {
        let response = self.http_client.get(self.url("/users")).send().await?;
        Ok(read_json::<UsersBody>(response).await?.users)
    }

    /// Create a user
    pub async fn add(&self, name: &str, email: &str) -> Result<User> {
        let response = self
            .http_client
            .post(self.url("/users"))
            .form(&[("action", "create"), ("name", name), ("email", email)])
            .send()
            .await?;
        Ok(read_json::<UserBody>(response).await?.user)
    }

    /// Update a user's name and email
    pub async fn update(&self, id: i64, name: &str, email: &str) -> Result<User> {
        let response = self
            .http_client
            .post(self.url(&format!("/users/{id}")))
            .form(&[("name", name), ("email", email)])
            .send()
            .await?;
        Ok(read_json::<UserBody>(response).await?.user)
    }

    /// Delete a user
    pub async fn remove(&self, id: i64) -> Result<()> {
        let id = id.to_string();
        let response = self
            .http_client
            .post(self.url("/users"))
            .form(&[("action", "delete"), ("id", id.as_str())])
            .send()
            .await?;
        read_json::<Value>(response).await?;
        Ok(())
    }
}

/// Decode a success body, or turn the server's `{"error"}` into an error
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"].as_str().unwrap_or("no error message");
        bail!("Server returned {status}: {message}");
    }
    response.json().await.context("Unexpected response body")
}

fn format_user(user: &User) -> String {
    format!("{:>4}  {} ({})", user.id, user.name, user.email)
}

/// Run one users command and print the result
pub async fn run(client: &UsersClient, command: UsersCommand) -> Result<()> {
    match command {
        UsersCommand::List => {
            let users = client.list().await.context("Failed to list users")?;
            if users.is_empty() {
                println!("No users");
            }
            for user in &users {
                println!("{}", format_user(user));
            }
        }
        UsersCommand::Add { name, email } => {
            let user = client.add(&name, &email).await.context("Failed to add user")?;
            println!("Created {}", format_user(&user));
        }
        UsersCommand::Update { id, name, email } => {
            let user = client
                .update(id, &name, &email)
                .await
                .context("Failed to update user")?;
            println!("Updated {}", format_user(&user));
        }
        UsersCommand::Remove { id } => {
            client.remove(id).await.context("Failed to remove user")?;
            println!("Removed user {id}");
        }
    }
    Ok(())
}
