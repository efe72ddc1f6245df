//! Study assistant terminal client
//!
//! (c) Softlandia 2025

use study_assistant::config::Settings;
use study_assistant::core::conversation::ConversationDeps;
use study_assistant::core::notifications::Notifier;
use study_assistant::core::services::MyStudyService;
use study_assistant::core::traits::{AssistantBackend, AudioRecorder, StudyService};
use study_assistant::infrastructure::database::DatabaseConnection;
use study_assistant::infrastructure::functions::EdgeFunctionsClient;
use study_assistant::infrastructure::identity::IdentityClient;
use study_assistant::infrastructure::recorder::CommandRecorder;
use study_assistant::infrastructure::repositories::DbStudyRepository;
use study_assistant::shell::Shell;

use anyhow::anyhow;
use di::{Injectable, ServiceCollection};
use log::info;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(client_task())
}

async fn client_task() -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(Settings::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbStudyRepository::singleton())
        .add(MyStudyService::singleton())
        .add(IdentityClient::singleton())
        .add(EdgeFunctionsClient::singleton())
        .add(CommandRecorder::singleton())
        .build_provider()
        .map_err(|e| anyhow!("invalid service configuration: {e:?}"))?;

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await?;

    let identity = provider.get_required::<IdentityClient>();
    let (notifier, toasts) = Notifier::channel();
    let deps = ConversationDeps {
        service: provider.get_required::<dyn StudyService>(),
        auth: identity.clone(),
        backend: provider.get_required::<dyn AssistantBackend>(),
        recorder: provider.get_required::<dyn AudioRecorder>(),
        notifier,
    };

    info!("study assistant ready");
    Shell::new(identity, deps).run(toasts).await?;
    info!("Shutting down...");

    Ok(())
}
