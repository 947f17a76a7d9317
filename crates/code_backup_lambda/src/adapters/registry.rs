use aws_sdk_lambda::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_lambda::operation::get_function::GetFunctionError;
use code_backup_core::contract::FunctionSnapshot;

/// Failure classification for the function registry, per target function.
/// `NotFound` and `AccessDenied` are reported without retry; `Transient`
/// failures are left to the platform's retry-on-invocation-failure path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NotFound(String),
    AccessDenied(String),
    Transient(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(message)
            | Self::AccessDenied(message)
            | Self::Transient(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for RegistryError {}

pub trait FunctionRegistry {
    fn describe_function(&self, function_name: &str) -> Result<FunctionSnapshot, RegistryError>;
}

pub struct AwsFunctionRegistry {
    lambda_client: aws_sdk_lambda::Client,
}

impl AwsFunctionRegistry {
    pub fn new(lambda_client: aws_sdk_lambda::Client) -> Self {
        Self { lambda_client }
    }
}

impl FunctionRegistry for AwsFunctionRegistry {
    fn describe_function(&self, function_name: &str) -> Result<FunctionSnapshot, RegistryError> {
        let client = self.lambda_client.clone();
        let name = function_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .get_function()
                    .function_name(&name)
                    .send()
                    .await
                    .map_err(|error| classify_get_function_error(&name, &error))?;

                let configuration = response.configuration().ok_or_else(|| {
                    RegistryError::Transient(format!(
                        "get_function for {name} returned no configuration"
                    ))
                })?;
                let code = response.code().ok_or_else(|| {
                    RegistryError::Transient(format!(
                        "get_function for {name} returned no code location"
                    ))
                })?;

                Ok(FunctionSnapshot {
                    function_name: name.clone(),
                    function_arn: configuration.function_arn().map(str::to_string),
                    version: configuration.version().map(str::to_string),
                    last_modified: configuration.last_modified().map(str::to_string),
                    code_sha256: configuration.code_sha256().unwrap_or_default().to_string(),
                    code_location: code.location().unwrap_or_default().to_string(),
                    code_size: Some(configuration.code_size()),
                })
            })
        })
    }
}

fn classify_get_function_error<R>(
    function_name: &str,
    error: &SdkError<GetFunctionError, R>,
) -> RegistryError {
    match error {
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            if service_error.is_resource_not_found_exception() {
                RegistryError::NotFound(format!(
                    "function {function_name} not found in registry: {service_error}"
                ))
            } else if service_error.code() == Some("AccessDeniedException") {
                RegistryError::AccessDenied(format!(
                    "get_function denied for {function_name}: {service_error}"
                ))
            } else {
                RegistryError::Transient(format!(
                    "get_function failed for {function_name}: {service_error}"
                ))
            }
        }
        other => RegistryError::Transient(format!(
            "get_function failed for {function_name}: {other}"
        )),
    }
}
