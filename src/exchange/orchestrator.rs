//! Exchange orchestration.

use std::sync::Arc;

use bytes::Bytes;

use super::poller::ImportPoller;
use super::{DocumentReport, DocumentState, ExchangeReport, ExchangeStep};
use crate::config::Config;
use crate::error::Result;
use crate::package::{DocumentKind, FilePackager};
use crate::protocol::{ExchangeSession, Method, ResponseStatus};
use crate::transfer::ChunkedTransfer;
use crate::transport::{HttpTransport, Transport};

/// Sequences a whole exchange run over one session.
///
/// Construct one orchestrator per run; the session it owns negotiates
/// capabilities exactly once.
#[derive(Debug)]
pub struct ExchangeOrchestrator {
    session: ExchangeSession,
    packager: FilePackager,
    max_polls: Option<u32>,
    report: ExchangeReport,
}

impl ExchangeOrchestrator {
    /// Create an orchestrator over `transport`
    pub fn new(transport: Arc<dyn Transport>, packager: FilePackager, max_polls: Option<u32>) -> Self {
        Self {
            session: ExchangeSession::new(transport),
            packager,
            max_polls,
            report: ExchangeReport::default(),
        }
    }

    /// Create an orchestrator talking HTTP to the configured endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.endpoint, &config.exchange)?;
        let packager = FilePackager::new(config.paths.clone(), config.exchange.no_copy);
        Ok(Self::new(
            Arc::new(transport),
            packager,
            config.exchange.max_polls,
        ))
    }

    /// Exchange import, offers and rests in that order, then send `catalog.complete`.
    ///
    /// The first failure aborts the run; later documents and `complete` are
    /// not sent.
    pub async fn run_full(&mut self) -> Result<ExchangeReport> {
        let result = self.full_sequence().await;
        self.finish(result)
    }

    /// Exchange exactly one document, without `catalog.complete`
    pub async fn run_single(&mut self, kind: DocumentKind) -> Result<ExchangeReport> {
        let result = self.single_sequence(kind).await;
        self.finish(result)
    }

    /// Report of the run so far, also available after a failure
    pub fn report(&self) -> &ExchangeReport {
        &self.report
    }

    /// Underlying session
    pub fn session(&self) -> &ExchangeSession {
        &self.session
    }

    async fn full_sequence(&mut self) -> Result<()> {
        self.negotiate().await?;

        for kind in DocumentKind::ALL {
            self.exchange_document(kind).await?;
        }

        let envelope = self
            .session
            .send(Method::Complete, None, Bytes::new())
            .await
            .map_err(|e| e.at(ExchangeStep::Complete))?;
        if envelope.status == ResponseStatus::Fail {
            tracing::warn!("complete answered fail: {}", envelope.log.join(" | "));
        }
        self.report.completed = true;
        Ok(())
    }

    async fn single_sequence(&mut self, kind: DocumentKind) -> Result<()> {
        self.negotiate().await?;
        self.exchange_document(kind).await
    }

    async fn negotiate(&mut self) -> Result<()> {
        self.session
            .check_auth()
            .await
            .map_err(|e| e.at(ExchangeStep::CheckAuth))?;
        self.session
            .init()
            .await
            .map_err(|e| e.at(ExchangeStep::Init))?;
        Ok(())
    }

    async fn exchange_document(&mut self, kind: DocumentKind) -> Result<()> {
        self.report.documents.push(DocumentReport::new(kind));
        let index = self.report.documents.len() - 1;

        let result = self.document_sequence(kind, index).await;
        if result.is_err() {
            self.report.documents[index].state = DocumentState::Failed;
        }
        result
    }

    async fn document_sequence(&mut self, kind: DocumentKind, index: usize) -> Result<()> {
        tracing::info!("Exchanging {}", kind.xml_name());

        let mut doc = self
            .packager
            .prepare(kind)
            .map_err(|e| e.at(ExchangeStep::Prepare(kind)))?;
        self.set_state(index, DocumentState::Staged);

        let caps = self
            .session
            .capabilities()
            .map_err(|e| e.at(ExchangeStep::Bundle(kind)))?;
        self.packager
            .bundle(&mut doc, &caps)
            .map_err(|e| e.at(ExchangeStep::Bundle(kind)))?;
        self.report.documents[index].zipped = doc.is_bundled();
        self.set_state(index, DocumentState::Bundled);

        if kind.has_images() && !doc.is_bundled() {
            let parts = ChunkedTransfer::new(&mut self.session)
                .send_loose_images(&doc)
                .await
                .map_err(|e| e.at(ExchangeStep::Images(kind)))?;
            self.report.documents[index].parts_sent += parts;
            self.set_state(index, DocumentState::ImagesSent);
        }

        let parts = ChunkedTransfer::new(&mut self.session)
            .send_main_file(&doc)
            .await
            .map_err(|e| e.at(ExchangeStep::MainFile(kind)))?;
        self.report.documents[index].parts_sent += parts;
        self.set_state(index, DocumentState::MainSent);

        self.set_state(index, DocumentState::ImportPending);
        let mut poller = ImportPoller::new(&mut self.session, self.max_polls);
        let result = poller.run(kind).await;
        self.report.documents[index].polls = poller.polls();
        result.map_err(|e| e.at(ExchangeStep::Import(kind)))?;
        self.set_state(index, DocumentState::ImportDone);

        Ok(())
    }

    fn set_state(&mut self, index: usize, state: DocumentState) {
        let doc = &mut self.report.documents[index];
        tracing::debug!(kind = %doc.kind, from = ?doc.state, to = ?state, "Document state");
        doc.state = state;
    }

    fn finish(&mut self, result: Result<()>) -> Result<ExchangeReport> {
        let dispatcher = self.session.dispatcher();
        self.report.requests = dispatcher.request_count();
        self.report.elapsed_secs = dispatcher.elapsed().as_secs_f64();

        match result {
            Ok(()) => {
                tracing::info!(
                    requests = self.report.requests,
                    "Exchange finished in {}",
                    crate::protocol::format_elapsed(dispatcher.elapsed())
                );
                Ok(self.report.clone())
            },
            Err(err) => {
                tracing::error!("Exchange aborted: {err}");
                for line in dispatcher.last_log() {
                    tracing::error!("  {line}");
                }
                Err(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use crate::error::ExchangeError;
    use crate::transport::ScriptedTransport;

    fn packager(dir: &std::path::Path) -> FilePackager {
        let paths = PathsConfig {
            templates_dir: dir.join("templates"),
            images_dir: dir.join("images"),
            staging_dir: dir.join("temp"),
            dictionaries_dir: dir.join("templates"),
        };
        std::fs::create_dir_all(&paths.templates_dir).unwrap();
        std::fs::create_dir_all(&paths.images_dir).unwrap();
        for kind in DocumentKind::ALL {
            std::fs::write(paths.templates_dir.join(kind.xml_name()), format!("<{kind}/>")).unwrap();
        }
        FilePackager::new(paths, false)
    }

    fn server(import_reply: &'static str) -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(move |req| {
            Ok(match req.method {
                Method::Init => "zip=no\nfile_limit=1000".to_string(),
                Method::Import => import_reply.to_string(),
                _ => "success".to_string(),
            })
        }))
    }

    #[tokio::test]
    async fn test_run_single_sends_no_complete() {
        let dir = tempfile::tempdir().unwrap();
        let transport = server("success");
        let mut orchestrator = ExchangeOrchestrator::new(transport.clone(), packager(dir.path()), None);

        let report = orchestrator.run_single(DocumentKind::Offers).await.unwrap();
        assert!(!report.completed);
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].state, DocumentState::ImportDone);
        assert_eq!(report.requests, 4);

        let methods: Vec<Method> = transport.requests().iter().map(|r| r.method).collect();
        assert_eq!(
            methods,
            vec![Method::CheckAuth, Method::Init, Method::File, Method::Import]
        );
    }

    #[tokio::test]
    async fn test_failure_names_step() {
        let dir = tempfile::tempdir().unwrap();
        let transport = server("fail\nbroken catalog");
        let mut orchestrator = ExchangeOrchestrator::new(transport.clone(), packager(dir.path()), None);

        let err = orchestrator.run_full().await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::StepFailed {
                step: ExchangeStep::Import(DocumentKind::Import),
                ..
            }
        ));
        assert_eq!(err.server_log(), Some(&["broken catalog".to_string()][..]));

        let report = orchestrator.report();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].state, DocumentState::Failed);
        assert_eq!(report.documents[0].polls, 1);
        assert!(!report.completed);
        assert!(transport.requests().iter().all(|r| r.method != Method::Complete));
    }

    #[tokio::test]
    async fn test_missing_template_fails_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let packager = packager(dir.path());
        std::fs::remove_file(packager.paths().templates_dir.join("rests.xml")).unwrap();
        let transport = server("success");
        let mut orchestrator = ExchangeOrchestrator::new(transport.clone(), packager, None);

        let err = orchestrator.run_full().await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::StepFailed {
                step: ExchangeStep::Prepare(DocumentKind::Rests),
                ..
            }
        ));
        assert!(matches!(err.root(), ExchangeError::Transfer(_)));
        assert_eq!(orchestrator.report().documents.len(), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_stops_before_init() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(ScriptedTransport::from_bodies(["fail\nwrong password"]));
        let mut orchestrator = ExchangeOrchestrator::new(transport.clone(), packager(dir.path()), None);

        let err = orchestrator.run_full().await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::StepFailed {
                step: ExchangeStep::CheckAuth,
                ..
            }
        ));
        assert_eq!(transport.request_count(), 1);
        assert!(orchestrator.report().documents.is_empty());
    }
}
