//! Startup data: the product catalog file and the demo account.

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::BackendError;
use crate::config::DemoAccountConfig;
use crate::models::{ProductForm, ValidationError};
use crate::services::{AuthError, AuthGateway, ProductAdmin};

/// Errors loading startup data.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("seed file is not a JSON array of products: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("product #{index} is invalid: {source}")]
    Invalid {
        index: usize,
        source: ValidationError,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("cannot register demo account: {0}")]
    DemoAccount(#[from] AuthError),
}

/// Parse a catalog file: a JSON array of add-product forms.
///
/// # Errors
///
/// Returns `SeedError::Parse` for malformed JSON and `SeedError::Invalid`
/// for the first entry that fails validation.
pub fn parse_products(json: &str) -> Result<Vec<crate::models::NewProduct>, SeedError> {
    let forms: Vec<ProductForm> = serde_json::from_str(json)?;
    forms
        .into_iter()
        .enumerate()
        .map(|(index, form)| {
            form.validate()
                .map_err(|source| SeedError::Invalid { index, source })
        })
        .collect()
}

/// Load a catalog file into the store. Returns the number of products added.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed, or a write fails.
pub async fn load_products(products: &ProductAdmin, path: &Path) -> Result<usize, SeedError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.to_owned(),
            source,
        })?;

    let parsed = parse_products(&json)?;
    let count = parsed.len();
    for product in parsed {
        products.add_product(product).await?;
    }

    info!(count, path = %path.display(), "Catalog seeded");
    Ok(count)
}

/// Register the demo account. An existing account is left alone.
///
/// # Errors
///
/// Returns `SeedError::DemoAccount` if registration fails for any other reason.
pub async fn register_demo_account(
    auth: &AuthGateway,
    demo: &DemoAccountConfig,
) -> Result<(), SeedError> {
    match auth
        .sign_up(&demo.email, demo.password.expose_secret(), &demo.name)
        .await
    {
        Ok(session) => {
            // The startup session is not handed to anyone.
            auth.sign_out(&session.token).await?;
            info!(email = %demo.email, "Demo account registered");
            Ok(())
        }
        Err(AuthError::UserAlreadyExists) => {
            warn!(email = %demo.email, "Demo account already exists");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
