use anyhow::{Context, Result};
use pantry_core::ai::{
    all_providers, normalize_endpoint, CapabilityProber, ModelLister, ProviderConfig, ProviderKind,
};
use pantry_core::ExtractionConfig;

/// Print the provider families this build knows about.
pub fn list_providers() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&all_providers())?);
    Ok(())
}

fn configured_provider(config: &ExtractionConfig) -> Result<&ProviderConfig> {
    config
        .provider
        .as_ref()
        .context("No AI provider configured (set PANTRY_AI_PROVIDER)")
}

/// List chat models offered by `kind`, or by the configured provider.
pub async fn list_models(config: &ExtractionConfig, kind: Option<ProviderKind>) -> Result<()> {
    let (kind, endpoint, api_key) = match (kind, config.provider.as_ref()) {
        (Some(kind), Some(p)) if p.kind == kind => (
            kind,
            p.endpoint.clone(),
            p.api_key().map(str::to_string),
        ),
        (Some(kind), _) => (kind, None, None),
        (None, _) => {
            let provider = configured_provider(config)?;
            (
                provider.kind,
                provider.endpoint.clone(),
                provider.api_key().map(str::to_string),
            )
        }
    };

    let models = ModelLister::new()
        .list(kind, endpoint.as_deref(), api_key.as_deref())
        .await
        .with_context(|| format!("Failed to list models for {}", kind))?;

    tracing::info!(provider = %kind, count = models.len(), "listed models");
    println!("{}", serde_json::to_string_pretty(&models)?);
    Ok(())
}

/// Print what the configured text and vision models accept.
pub async fn probe(config: &ExtractionConfig) -> Result<()> {
    let provider = configured_provider(config)?;
    let prober = CapabilityProber::new();
    let endpoint = provider
        .endpoint
        .as_deref()
        .map(|e| normalize_endpoint(e, provider.kind.is_local()));

    let text = prober
        .probe(provider.kind, endpoint.as_deref(), Some(&provider.model))
        .await;
    let vision = prober
        .probe(
            provider.kind,
            endpoint.as_deref(),
            Some(provider.vision_model_name()),
        )
        .await;

    let json = serde_json::json!({
        "provider": provider.kind,
        "model": provider.model,
        "capabilities": text,
        "visionModel": provider.vision_model_name(),
        "visionCapabilities": vision,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
