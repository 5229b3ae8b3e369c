use entrypeek_core::{EntryFetcher, FetchConfig, FetchError, FetchRequest, TracingLogger};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for a single fetch, as given on the command line.
#[derive(Debug)]
pub struct FetchArgs {
    pub package: String,
    pub tag: Option<String>,
    pub retries: u32,
    pub registries: Vec<String>,
    pub npm: Option<PathBuf>,
    pub no_package_manager: bool,
    pub timeout_secs: Option<u64>,
    pub work_root: Option<PathBuf>,
}

impl FetchArgs {
    /// Layer the command-line overrides on top of the environment.
    fn config(&self) -> FetchConfig {
        let mut config = FetchConfig::from_env();

        if !self.registries.is_empty() {
            config = config.with_registries(self.registries.iter().cloned());
        }
        if let Some(npm) = &self.npm {
            config = config.with_npm_program(npm);
        }
        if self.no_package_manager {
            config = config.with_package_manager(false);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_attempt_timeout(Some(Duration::from_secs(secs)));
        }
        if let Some(root) = &self.work_root {
            config = config.with_work_root(root);
        }

        config
    }

    /// Progress lines go through the subscriber so stdout carries only the result.
    fn request(&self) -> FetchRequest {
        let request = FetchRequest::new(&self.package)
            .with_max_retries(self.retries)
            .with_logger(Arc::new(TracingLogger));
        match &self.tag {
            Some(tag) => request.with_dist_tag(tag),
            None => request,
        }
    }
}

/// Fetch result for JSON output.
#[derive(Serialize)]
struct FetchOutput<'a> {
    ok: bool,
    package: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    stage: &'static str,
    message: String,
}

/// Run the fetch and print the entry file.
pub fn run(args: FetchArgs, json: bool) -> Result<()> {
    let config = args.config();
    let request = args.request();

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = match EntryFetcher::new(config) {
        Ok(fetcher) => runtime.block_on(fetcher.fetch(&request)),
        Err(e) => Err(FetchError::from(e)),
    };

    match result {
        Ok(content) => {
            if json {
                let output = FetchOutput {
                    ok: true,
                    package: &args.package,
                    content: Some(&content),
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
            } else {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes()).into_diagnostic()?;
                stdout.flush().into_diagnostic()?;
            }
            Ok(())
        }
        Err(e) => report_failure(&args.package, &e, json),
    }
}

fn report_failure(package: &str, error: &FetchError, json: bool) -> Result<()> {
    if json {
        let output = FetchOutput {
            ok: false,
            package,
            content: None,
            error: Some(ErrorInfo {
                code: error.code(),
                stage: error.stage().as_str(),
                message: error.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        std::process::exit(1);
    }

    Err(miette::miette!(
        code = error.code(),
        help = "run with -v to see each strategy's progress",
        "{error}"
    ))
}
