use code_backup_core::contract::InvocationSummary;
use code_backup_lambda::adapters::artifact::HttpArtifactFetcher;
use code_backup_lambda::adapters::object_store::S3BackupStore;
use code_backup_lambda::adapters::registry::AwsFunctionRegistry;
use code_backup_lambda::handlers::backup::{handle_backup_event, BackupConfig, TimeBudget};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<InvocationSummary, Error> {
    let config = BackupConfig::from_env().map_err(Error::from)?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let registry = AwsFunctionRegistry::new(aws_sdk_lambda::Client::new(&aws_config));
    let store = S3BackupStore::new(
        config.destination_bucket.clone(),
        aws_sdk_s3::Client::new(&aws_config),
    );
    let fetcher = HttpArtifactFetcher::default();
    let budget = TimeBudget::with_deadline(event.context.deadline as i64);

    handle_backup_event(
        &event.payload,
        &config,
        &budget,
        &registry,
        &store,
        &fetcher,
    )
    .map_err(|failure| Error::from(failure.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
