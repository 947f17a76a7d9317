use serde_json::Value;

/// The inbound payload carried no resolvable function identifier and no
/// fallback list was configured. Fails the whole invocation: there is
/// nothing to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEvent {
    message: String,
}

impl MalformedEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for MalformedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MalformedEvent {}

/// The two payload shapes the handler accepts, resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Direct invocation with a top-level `functionName` field.
    Direct { function_identifier: String },
    /// Event-bus envelope carrying `requestParameters.functionName`, either
    /// under a `detail` wrapper or at the top level.
    BusEnvelope { function_identifier: String },
    Unrecognized,
}

pub fn classify_event(event: &Value) -> InboundEvent {
    if let Some(name) = non_empty_string(event.get("functionName")) {
        return InboundEvent::Direct {
            function_identifier: name,
        };
    }

    let request_parameters = event
        .get("detail")
        .and_then(|detail| detail.get("requestParameters"))
        .or_else(|| event.get("requestParameters"));
    if let Some(name) = non_empty_string(request_parameters.and_then(|p| p.get("functionName"))) {
        return InboundEvent::BusEnvelope {
            function_identifier: name,
        };
    }

    InboundEvent::Unrecognized
}

/// Reduce a function identifier to its short name. Accepts plain names,
/// qualified names (`name:alias`), and full ARNs with or without a qualifier.
pub fn short_function_name(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let name_part = match trimmed.split_once(":function:") {
        Some((_, rest)) => rest,
        None => trimmed,
    };
    match name_part.split_once(':') {
        Some((name, _qualifier)) => name.to_string(),
        None => name_part.to_string(),
    }
}

/// Parse the configured comma-separated fallback list.
pub fn parse_target_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve the ordered, deduplicated list of short function names to process
/// in this invocation. The event identifier wins; the fallback list is used
/// only when the payload carries no identifier at all.
pub fn normalize_targets(
    event: &Value,
    fallback_targets: &[String],
) -> Result<Vec<String>, MalformedEvent> {
    let candidates: Vec<String> = match classify_event(event) {
        InboundEvent::Direct {
            function_identifier,
        }
        | InboundEvent::BusEnvelope {
            function_identifier,
        } => vec![function_identifier],
        InboundEvent::Unrecognized => fallback_targets.to_vec(),
    };

    let mut targets: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let name = short_function_name(&candidate);
        if name.is_empty() || targets.contains(&name) {
            continue;
        }
        targets.push(name);
    }

    if targets.is_empty() {
        return Err(MalformedEvent::new(
            "no target functions resolvable: event carries no function identifier and no fallback list is configured",
        ));
    }

    Ok(targets)
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
