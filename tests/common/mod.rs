//! Shared fixtures for exchange integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::sync::{Arc, Mutex};

use cml::transport::ExchangeRequest;
use cml::{DocumentKind, FilePackager, Method, PathsConfig, ScriptedTransport};
use tempfile::TempDir;

#[derive(Default)]
struct ServerState {
    zip: bool,
    file_limit: usize,
    cookie: Option<(String, String)>,
    import_replies: HashMap<String, VecDeque<String>>,
    files: HashMap<String, Vec<u8>>,
    upload_order: Vec<String>,
    oversized_parts: usize,
}

/// In-memory exchange endpoint that rebuilds uploaded files
#[derive(Clone)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    pub fn new(zip: bool, file_limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                zip,
                file_limit,
                ..ServerState::default()
            })),
        }
    }

    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.state.lock().unwrap().cookie = Some((name.to_string(), value.to_string()));
        self
    }

    /// Replies to `catalog.import` for `<kind>.xml`; `success` once exhausted
    pub fn with_import_replies(self, kind: DocumentKind, replies: &[&str]) -> Self {
        self.state.lock().unwrap().import_replies.insert(
            kind.xml_name(),
            replies.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    pub fn transport(&self) -> Arc<ScriptedTransport> {
        let server = self.clone();
        Arc::new(ScriptedTransport::new(move |request| Ok(server.respond(request))))
    }

    pub fn respond(&self, request: &ExchangeRequest) -> String {
        let mut state = self.state.lock().unwrap();

        match request.method {
            Method::CheckAuth => match &state.cookie {
                Some((name, value)) => format!("success\n{name}\n{value}"),
                None => "success".to_string(),
            },
            Method::Init => format!(
                "zip={}\nfile_limit={}",
                if state.zip { "yes" } else { "no" },
                state.file_limit
            ),
            Method::File => {
                let name = request.filename.clone().unwrap_or_default();
                if request.body.len() > state.file_limit {
                    state.oversized_parts += 1;
                }
                if !state.files.contains_key(&name) {
                    state.upload_order.push(name.clone());
                }
                state
                    .files
                    .entry(name)
                    .or_default()
                    .extend_from_slice(&request.body);
                "success".to_string()
            },
            Method::Import => {
                let name = request.filename.clone().unwrap_or_default();
                state
                    .import_replies
                    .get_mut(&name)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(|| "success\nimport finished".to_string())
            },
            Method::Complete => "success".to_string(),
        }
    }

    /// Reassembled upload
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(name).cloned()
    }

    /// Uploaded file names in order of their first part
    pub fn upload_order(&self) -> Vec<String> {
        self.state.lock().unwrap().upload_order.clone()
    }

    pub fn oversized_parts(&self) -> usize {
        self.state.lock().unwrap().oversized_parts
    }

    /// Entry names and contents of an uploaded archive
    pub fn archive_entries(&self, name: &str) -> Vec<(String, Vec<u8>)> {
        let bytes = self.file(name).expect("archive uploaded");
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                (entry.name().to_string(), content)
            })
            .collect()
    }
}

/// Templates, images and staging directory in a temp dir
pub struct Workspace {
    _dir: TempDir,
    pub paths: PathsConfig,
}

impl Workspace {
    /// Workspace with `import.xml` referencing `images`, each image `size` bytes
    pub fn new(images: &[&str], size: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let paths = PathsConfig {
            templates_dir: root.join("templates"),
            images_dir: root.join("templates").join("images"),
            staging_dir: root.join("temp"),
            dictionaries_dir: root.join("templates"),
        };
        std::fs::create_dir_all(&paths.images_dir).unwrap();

        let mut import = String::from("<КоммерческаяИнформация><Каталог><Товары>");
        for (i, image) in images.iter().enumerate() {
            import.push_str(&format!(
                "<Товар><Ид>{i}</Ид><Наименование>Товар {i}</Наименование><Картинка>{image}</Картинка></Товар>"
            ));
            let content: Vec<u8> = (0..size).map(|b| (b * 7 + i) as u8).collect();
            std::fs::write(paths.images_dir.join(image), content).unwrap();
        }
        import.push_str("</Товары></Каталог></КоммерческаяИнформация>");

        std::fs::write(paths.templates_dir.join("import.xml"), &import).unwrap();
        std::fs::write(
            paths.templates_dir.join("offers.xml"),
            "<КоммерческаяИнформация><ПакетПредложений><Предложения/></ПакетПредложений></КоммерческаяИнформация>",
        )
        .unwrap();
        std::fs::write(
            paths.templates_dir.join("rests.xml"),
            "<КоммерческаяИнформация><ПакетПредложений><Остатки/></ПакетПредложений></КоммерческаяИнформация>",
        )
        .unwrap();

        Self { _dir: dir, paths }
    }

    pub fn packager(&self) -> FilePackager {
        FilePackager::new(self.paths.clone(), false)
    }

    pub fn template(&self, kind: DocumentKind) -> Vec<u8> {
        std::fs::read(self.paths.templates_dir.join(kind.xml_name())).unwrap()
    }

    pub fn image(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.paths.images_dir.join(name)).unwrap()
    }
}
