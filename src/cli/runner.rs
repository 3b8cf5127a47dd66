//! CLI runner - executes commands

use crate::auth::{
    clear_tokens, read_tokens, save_tokens, AuthInterceptor, AuthTokens, FileTokenStore,
    SessionInvalidated, SessionListener,
};
use crate::cli::commands::{Cli, Commands, TokenAction};
use crate::config::AppConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClient, RequestConfig};
use crate::infra::{GalleryInfra, StackSelection};
use crate::types::{Method, Stage};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Token file used when neither the CLI nor the config names one
const DEFAULT_TOKEN_FILE: &str = ".gallery/tokens.json";

/// Tells the operator to sign in again
#[derive(Debug, Default)]
struct PromptListener;

impl SessionListener for PromptListener {
    fn session_invalidated(&self, event: &SessionInvalidated) {
        warn!("Session invalidated by {}", event.request_url);
        eprintln!(
            "Session expired. Sign in again (redirect: {}).",
            event.redirect_to
        );
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Synth {
                stack,
                stage,
                out_dir,
            } => self.synth((*stack).into(), *stage, out_dir.as_deref()),
            Commands::Tokens { action } => self.tokens(action).await,
            Commands::Request { method, path, data } => {
                self.request((*method).into(), path, data.as_deref()).await
            }
            Commands::Check => self.check(),
        }
    }

    /// Load and validate the configuration file
    fn load_config(&self) -> Result<AppConfig> {
        let config = AppConfig::load(&self.cli.config)?;
        config.validate()?;
        Ok(config)
    }

    /// Token file from the CLI, then the config, then the default
    fn token_file(&self, config: Option<&AppConfig>) -> PathBuf {
        self.cli
            .token_file
            .clone()
            .or_else(|| config.and_then(|c| c.auth.token_file.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE))
    }

    /// Synthesize templates
    fn synth(
        &self,
        selection: StackSelection,
        stage: Option<Stage>,
        out_dir: Option<&Path>,
    ) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(stage) = stage {
            config.infra.stage = stage;
        }

        let start = Instant::now();
        let templates = GalleryInfra::from_settings(&config.infra).synthesize(selection)?;

        match out_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                for (name, template) in &templates {
                    let path = dir.join(format!("{name}.template.json"));
                    fs::write(&path, template.to_json_pretty()?)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{}", path.display());
                }
            }
            None => {
                let combined: serde_json::Map<String, Value> = templates
                    .iter()
                    .map(|(name, template)| -> Result<(String, Value)> {
                        Ok((name.clone(), serde_json::to_value(template)?))
                    })
                    .collect::<Result<_>>()?;
                println!("{}", serde_json::to_string_pretty(&combined)?);
            }
        }

        info!(
            "Synthesized {} stack(s) for {} in {:?}",
            templates.len(),
            config.infra.stage,
            start.elapsed()
        );
        Ok(())
    }

    /// Token subcommands
    async fn tokens(&self, action: &TokenAction) -> Result<()> {
        // The config is optional here; a missing file just means defaults.
        let config = match AppConfig::load(&self.cli.config) {
            Ok(config) => Some(config),
            Err(Error::FileNotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let key = config
            .as_ref()
            .map_or(crate::auth::AUTH_TOKENS_KEY, |c| c.auth.token_key.as_str());
        let store = FileTokenStore::new(self.token_file(config.as_ref()));

        match action {
            TokenAction::Show => {
                let Some(tokens) = read_tokens(&store, key).await else {
                    println!("Not signed in");
                    return Ok(());
                };
                match tokens.id_claims() {
                    Some(claims) => {
                        let who = claims
                            .email
                            .as_deref()
                            .or(claims.username.as_deref())
                            .or(claims.sub.as_deref())
                            .unwrap_or("unknown user");
                        println!("Signed in as {who}");
                        if let Some(expires) = claims.expires_at() {
                            let state = if claims.is_expired() { "expired" } else { "expires" };
                            println!("Token {state} at {}", expires.to_rfc3339());
                        }
                    }
                    None => println!("Signed in (id token is not a readable JWT)"),
                }
                if tokens.refresh_token.is_some() {
                    println!("Refresh token present");
                }
            }
            TokenAction::Set {
                access_token,
                id_token,
                refresh_token,
            } => {
                let mut tokens = AuthTokens::new(access_token.clone(), id_token.clone());
                if let Some(refresh) = refresh_token {
                    tokens = tokens.with_refresh_token(refresh.clone());
                }
                save_tokens(&store, key, &tokens).await?;
                info!("Stored tokens in {}", store.path().display());
            }
            TokenAction::Clear => {
                clear_tokens(&store, key).await?;
                info!("Cleared tokens in {}", store.path().display());
            }
        }

        Ok(())
    }

    /// Send one API request through the interceptor
    async fn request(&self, method: Method, path: &str, data: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let store = Arc::new(FileTokenStore::new(self.token_file(Some(&config))));

        let interceptor = AuthInterceptor::new(store, Arc::new(PromptListener))
            .with_bypass(config.auth.bypass_rules())
            .with_token_key(config.auth.token_key.clone())
            .with_redirect(config.auth.login_redirect.clone());
        let client = HttpClient::with_interceptor(config.http_client_config(), interceptor)?;

        let mut request = RequestConfig::new();
        if let Some(body) = data {
            let body: Value = serde_json::from_str(body)
                .map_err(|e| Error::invalid_value("--data", e.to_string()))?;
            request = request.json(body);
        }

        let start = Instant::now();
        let response = client.request(method, path, request).await?;
        let status = response.status();
        let text = response.text().await?;
        info!("{:?} {} -> {} in {:?}", method, path, status, start.elapsed());

        match serde_json::from_str::<Value>(&text) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{text}"),
        }
        Ok(())
    }

    /// Validate the configuration
    fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let cognito = &config.environment.cognito;

        println!("Configuration OK: {}", self.cli.config.display());
        println!("  stage:      {}", config.infra.stage);
        println!("  api:        {}", config.environment.api_url);
        println!("  domain:     {}", config.infra.base_domain);
        println!("  sign-in:    {}", cognito.authorize_url()?);
        println!("  token url:  {}", cognito.token_url());
        if config.environment.production != config.infra.stage.is_production() {
            warn!(
                "environment.production is {} but the stage is {}",
                config.environment.production, config.infra.stage
            );
        }
        Ok(())
    }
}
