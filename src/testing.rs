//! In-memory stand-ins for npm and the bundler

use crate::bundler::{BuildOutcome, BuildRequest, BuiltAsset, Bundler};
use crate::error::BundleCostResult;
use crate::tool::{ToolInvocation, ToolOutput, ToolRunner};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Plays npm
///
/// `npm view` answers with `published`. `npm install` writes a manifest for
/// every requested package into the working directory, declaring
/// `peer_dependencies`.
#[derive(Default)]
pub struct FakeRunner {
    pub fail_install: bool,
    pub peer_dependencies: Vec<String>,
    pub published: Option<String>,
    pub installs: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn installs(&self) -> Vec<Vec<String>> {
        self.installs.lock().unwrap().clone()
    }

    fn view(&self) -> ToolOutput {
        match &self.published {
            Some(published) => ToolOutput {
                code: Some(0),
                stdout: published.clone(),
                stderr: String::new(),
            },
            None => ToolOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "npm ERR! code E404".to_string(),
            },
        }
    }

    fn install(&self, invocation: &ToolInvocation) -> ToolOutput {
        let specs: Vec<String> = invocation
            .args
            .iter()
            .skip(1)
            .take_while(|arg| !arg.starts_with("--"))
            .cloned()
            .collect();
        self.installs.lock().unwrap().push(specs.clone());

        if self.fail_install {
            return ToolOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "npm ERR! code E404".to_string(),
            };
        }

        let cwd = invocation.cwd.clone().unwrap();
        let peers: serde_json::Map<String, serde_json::Value> = self
            .peer_dependencies
            .iter()
            .map(|peer| (peer.clone(), serde_json::json!("*")))
            .collect();
        for spec in &specs {
            let name = match spec.rfind('@') {
                Some(at) if at > 0 => &spec[..at],
                _ => spec.as_str(),
            };
            let module_dir = cwd.join("node_modules").join(name);
            std::fs::create_dir_all(&module_dir).unwrap();
            let manifest = serde_json::json!({
                "name": name,
                "dependencies": {},
                "peerDependencies": peers,
            });
            std::fs::write(module_dir.join("package.json"), manifest.to_string()).unwrap();
        }

        ToolOutput {
            code: Some(0),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ToolRunner for FakeRunner {
    async fn run(&self, invocation: &ToolInvocation) -> BundleCostResult<ToolOutput> {
        match invocation.args.first().map(String::as_str) {
            Some("view") => Ok(self.view()),
            Some("install") => Ok(self.install(invocation)),
            other => panic!("unexpected npm command {:?}", other),
        }
    }
}

/// One scripted bundler run
#[derive(Debug, Clone)]
pub enum Script {
    /// Write these (name, chunk, content) files and report them
    Assets(Vec<(&'static str, &'static str, String)>),
    Fail(Vec<String>),
    Panic,
}

impl Script {
    /// A hard failure naming `specifier` as unresolvable
    pub fn not_found(specifier: &str) -> Self {
        Self::Fail(vec![format!(
            "Module not found: Error: Can't resolve '{}' in '/ws/node_modules/pkg'",
            specifier
        )])
    }
}

/// Plays the bundler from a queue of scripts, then `fallback` forever
pub struct ScriptedBundler {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    requests: Mutex<Vec<BuildRequest>>,
}

impl ScriptedBundler {
    pub fn new(scripts: Vec<Script>, fallback: Script) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bundler for ScriptedBundler {
    async fn bundle(&self, request: &BuildRequest) -> BundleCostResult<BuildOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match script {
            Script::Assets(files) => {
                std::fs::create_dir_all(&request.out_dir).unwrap();
                let assets = files
                    .into_iter()
                    .map(|(name, chunk_name, content)| {
                        std::fs::write(request.out_dir.join(name), &content).unwrap();
                        BuiltAsset {
                            name: name.to_string(),
                            chunk_name: chunk_name.to_string(),
                            size: content.len() as u64,
                        }
                    })
                    .collect();
                Ok(BuildOutcome::Manifest {
                    assets,
                    diagnostics: vec![],
                })
            }
            Script::Fail(diagnostics) => Ok(BuildOutcome::Failed { diagnostics }),
            Script::Panic => panic!("bundler exploded"),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A small minified module, compressible enough that gzip < size
pub fn left_pad_source() -> String {
    "module.exports=function(s,n,c){s=String(s);while(s.length<n)s=c+s;return s};".repeat(5)
}

/// A bundle containing only `main.bundle.js`
pub fn main_bundle(source: String) -> Script {
    Script::Assets(vec![("main.bundle.js", "main", source)])
}
