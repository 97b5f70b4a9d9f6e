//! Chunked transfer.
//!
//! Payloads larger than the negotiated `file_limit` are split into parts and
//! uploaded with consecutive `catalog.file` requests under the same name.
//! The server rebuilds the file by concatenating the parts in arrival order,
//! so parts of one file are always sent in increasing index order and
//! loose images always complete before the main document starts.

use bytes::Bytes;

use crate::error::{ExchangeError, Result};
use crate::package::StagedDocument;
use crate::protocol::{ExchangeSession, FileTarget, Method};

/// Split `payload` into parts of at most `max_part_bytes` bytes.
///
/// Produces `ceil(len / max_part_bytes)` parts; an empty payload yields none.
/// Parts share the payload buffer.
pub fn split_parts(payload: &Bytes, max_part_bytes: usize) -> Vec<Bytes> {
    let limit = max_part_bytes.max(1);
    (0..payload.len())
        .step_by(limit)
        .map(|start| payload.slice(start..(start + limit).min(payload.len())))
        .collect()
}

/// Uploads staged documents over an established session
#[derive(Debug)]
pub struct ChunkedTransfer<'a> {
    session: &'a mut ExchangeSession,
}

impl<'a> ChunkedTransfer<'a> {
    /// Transfer over `session`
    pub fn new(session: &'a mut ExchangeSession) -> Self {
        Self { session }
    }

    /// Upload every staged image of an unbundled `import` document.
    ///
    /// Does nothing when the document was bundled or references no images.
    /// Returns the number of parts sent.
    pub async fn send_loose_images(&mut self, doc: &StagedDocument) -> Result<u32> {
        if doc.is_bundled() || !doc.kind.has_images() {
            return Ok(0);
        }

        let mut sent = 0;
        for image in &doc.images {
            let payload = doc.read_image(image)?;
            sent += self.send_file(image, &payload).await?;
        }
        Ok(sent)
    }

    /// Upload the main payload, `<kind>.zip` when bundled, `<kind>.xml` otherwise.
    ///
    /// Returns the number of parts sent.
    pub async fn send_main_file(&mut self, doc: &StagedDocument) -> Result<u32> {
        let payload = doc.main_payload();
        self.send_file(&doc.main_file_name(), &payload).await
    }

    async fn send_file(&mut self, name: &str, payload: &Bytes) -> Result<u32> {
        let caps = self.session.capabilities()?;
        let parts = split_parts(payload, caps.max_part_bytes);

        tracing::debug!(
            file = name,
            bytes = payload.len(),
            parts = parts.len(),
            "Uploading"
        );

        let mut index = 0;
        for part in parts {
            index += 1;
            let target = FileTarget::part(name, index);
            let envelope = self.session.send(Method::File, Some(&target), part).await?;
            if envelope.is_fail() {
                return Err(ExchangeError::Transfer(format!(
                    "server rejected {target}: {}",
                    envelope.log.join(" | ")
                )));
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::DocumentKind;
    use crate::transport::ScriptedTransport;
    use proptest::prelude::*;
    use std::sync::Arc;

    proptest! {
        #[test]
        fn split_parts_reassembles(data in proptest::collection::vec(any::<u8>(), 0..4096), limit in 1usize..700) {
            let payload = Bytes::from(data.clone());
            let parts = split_parts(&payload, limit);

            prop_assert_eq!(parts.len(), data.len().div_ceil(limit));
            prop_assert!(parts.iter().all(|p| !p.is_empty() && p.len() <= limit));
            prop_assert_eq!(parts.concat(), data);
        }
    }

    #[test]
    fn test_split_exact_multiple() {
        let parts = split_parts(&Bytes::from_static(b"abcdef"), 3);
        assert_eq!(parts, vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")]);
        assert!(split_parts(&Bytes::new(), 10).is_empty());
    }

    async fn ready_session(init: &str) -> (ExchangeSession, Arc<ScriptedTransport>) {
        let init = init.to_string();
        let transport = Arc::new(ScriptedTransport::new(move |req| {
            Ok(match req.method {
                Method::Init => init.clone(),
                _ => "success".to_string(),
            })
        }));
        let mut session = ExchangeSession::new(transport.clone());
        session.check_auth().await.unwrap();
        session.init().await.unwrap();
        (session, transport)
    }

    fn staged(kind: DocumentKind, xml: &'static [u8], images: &[&str], dir: &std::path::Path) -> StagedDocument {
        StagedDocument {
            kind,
            staging_dir: dir.to_path_buf(),
            xml: Bytes::from_static(xml),
            images: images.iter().map(|s| s.to_string()).collect(),
            archive: None,
        }
    }

    #[tokio::test]
    async fn test_images_before_main_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.jpg"), vec![7u8; 10]).unwrap();
        std::fs::write(dir.path().join("2.jpg"), vec![8u8; 3]).unwrap();
        let doc = staged(DocumentKind::Import, b"<a>1.jpg 2.jpg</a>", &["1.jpg", "2.jpg"], dir.path());

        let (mut session, transport) = ready_session("zip=no\nfile_limit=4").await;
        let mut transfer = ChunkedTransfer::new(&mut session);
        assert_eq!(transfer.send_loose_images(&doc).await.unwrap(), 4);
        assert_eq!(transfer.send_main_file(&doc).await.unwrap(), 5);

        let uploads: Vec<_> = session
            .dispatcher()
            .audit()
            .iter()
            .filter_map(|e| e.target.as_ref().map(ToString::to_string))
            .collect();
        assert_eq!(
            uploads,
            vec![
                "1.jpg:1", "1.jpg:2", "1.jpg:3", "2.jpg:1", "import.xml:1", "import.xml:2",
                "import.xml:3", "import.xml:4", "import.xml:5"
            ]
        );

        let main: Vec<u8> = transport
            .requests()
            .iter()
            .filter(|r| r.filename.as_deref() == Some("import.xml"))
            .flat_map(|r| r.body.to_vec())
            .collect();
        assert_eq!(main, b"<a>1.jpg 2.jpg</a>");
    }

    #[tokio::test]
    async fn test_bundled_document_skips_loose_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = staged(DocumentKind::Import, b"<a>1.jpg</a>", &["1.jpg"], dir.path());
        doc.archive = Some(Bytes::from_static(b"PK-archive"));

        let (mut session, transport) = ready_session("zip=yes\nfile_limit=100").await;
        let mut transfer = ChunkedTransfer::new(&mut session);
        assert_eq!(transfer.send_loose_images(&doc).await.unwrap(), 0);
        assert_eq!(transfer.send_main_file(&doc).await.unwrap(), 1);

        let last = transport.requests().pop().unwrap();
        assert_eq!(last.filename.as_deref(), Some("import.zip"));
        assert_eq!(&last.body[..], b"PK-archive");
    }

    #[tokio::test]
    async fn test_rejected_part_stops_upload() {
        let dir = tempfile::tempdir().unwrap();
        let doc = staged(DocumentKind::Rests, b"<rests/>", &[], dir.path());
        let transport = Arc::new(ScriptedTransport::from_bodies([
            "success",
            "zip=no\nfile_limit=3",
            "success",
            "fail\ndisk full",
        ]));
        let mut session = ExchangeSession::new(transport.clone());
        session.check_auth().await.unwrap();
        session.init().await.unwrap();

        let err = ChunkedTransfer::new(&mut session)
            .send_main_file(&doc)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rests.xml:2"));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn test_requires_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let doc = staged(DocumentKind::Offers, b"<o/>", &[], dir.path());
        let transport = Arc::new(ScriptedTransport::from_bodies(Vec::<String>::new()));
        let mut session = ExchangeSession::new(transport.clone());

        let err = ChunkedTransfer::new(&mut session)
            .send_main_file(&doc)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::CapabilitiesMissing));
        assert_eq!(transport.request_count(), 0);
    }
}
