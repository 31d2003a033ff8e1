//! Container configuration for integration tests.

use std::collections::HashMap;

use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// Plain PostgreSQL container image used to back `PostgresStore` in tests.
#[derive(Debug, Clone)]
pub struct TestPostgres {
    env_vars: HashMap<String, String>,
}

impl Default for TestPostgres {
    fn default() -> Self {
        let mut env_vars = HashMap::new();
        env_vars.insert("POSTGRES_USER".to_string(), "postgres".to_string());
        env_vars.insert("POSTGRES_PASSWORD".to_string(), "postgres".to_string());
        env_vars.insert("POSTGRES_DB".to_string(), "guard_test".to_string());
        Self { env_vars }
    }
}

impl Image for TestPostgres {
    fn name(&self) -> &str {
        "postgres"
    }

    fn tag(&self) -> &str {
        "16-alpine"
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        )]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<
        Item = (
            impl Into<std::borrow::Cow<'_, str>>,
            impl Into<std::borrow::Cow<'_, str>>,
        ),
    > {
        self.env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(5432)]
    }
}

/// Build a connection string for a running test Postgres container.
pub fn build_connection_string(host: &str, port: u16) -> String {
    format!("postgres://postgres:postgres@{host}:{port}/guard_test")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_default_config() {
        let image = TestPostgres::default();
        assert_eq!(image.name(), "postgres");
        assert_eq!(image.tag(), "16-alpine");
    }
}
