//! End-to-end runs of the conversion service against shell-script converters.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pdfsuper_convert::scripting::ScriptingEngine;
use pdfsuper_convert::{
    ConversionError, ConversionRequest, ConversionService, ConverterLocator, Phase, TargetFormat,
};
use pdfsuper_core::config::converter::{ConverterConfig, ConverterKind, OutputPolicy};
use tokio_util::sync::CancellationToken;

/// Parses the office-style flags into `$token`, `$outdir` and `$input`.
const PARSE_ARGS: &str = r#"
script="$1"
while [ $# -gt 0 ]; do
  case "$1" in
    --headless) ;;
    --convert-to) shift; token="$1" ;;
    --outdir) shift; outdir="$1" ;;
    *) input="$1" ;;
  esac
  shift
done
"#;

struct Fixture {
    _temp: tempfile::TempDir,
    bin: PathBuf,
    docs: PathBuf,
    scratch: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let bin = temp.path().join("bin");
        let docs = temp.path().join("docs");
        std::fs::create_dir_all(&bin).expect("mkdir bin");
        std::fs::create_dir_all(&docs).expect("mkdir docs");
        Self {
            scratch: temp.path().join("scratch"),
            _temp: temp,
            bin,
            docs,
        }
    }

    fn stub(&self, name: &str, body: &str) -> PathBuf {
        let path = self.bin.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{PARSE_ARGS}\n{body}\n")).expect("write stub");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    fn source(&self, name: &str) -> PathBuf {
        let path = self.docs.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, b"%PDF-1.7\n%stub\n").expect("write source");
        path
    }

    fn config(&self) -> ConverterConfig {
        ConverterConfig {
            temp_root: Some(self.scratch.clone()),
            timeout_seconds: 30,
            ..ConverterConfig::default()
        }
    }

    fn service(&self, config: ConverterConfig, stub: &Path) -> ConversionService {
        let kind = config.kind;
        ConversionService::new(config)
            .with_locator(ConverterLocator::with_candidates(kind, vec![stub.to_path_buf()]))
    }

    fn assert_no_workspace(&self) {
        if self.scratch.exists() {
            let leftovers: Vec<_> = std::fs::read_dir(&self.scratch)
                .expect("read scratch")
                .filter_map(|e| e.ok())
                .map(|e| e.file_name())
                .collect();
            assert!(leftovers.is_empty(), "workspace left behind: {leftovers:?}");
        }
    }
}

#[tokio::test]
async fn test_single_arbitrarily_named_output() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", r#"printf 'converted' > "$outdir/whatever-name.tmp""#);
    let source = fx.source("letter.pdf");
    let service = fx.service(fx.config(), &stub);

    let destination = service
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect("convert");

    assert_eq!(destination, fx.docs.join("letter.docx"));
    assert_eq!(std::fs::read(&destination).expect("read"), b"converted");
    assert_eq!(*service.subscribe().borrow(), Phase::Done);
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_nonzero_exit_reports_stderr_verbatim() {
    let fx = Fixture::new();
    let stub = fx.stub(
        "soffice",
        "printf 'Error: source file could not be loaded' >&2\nexit 3",
    );
    let source = fx.source("broken.pdf");

    let err = fx
        .service(fx.config(), &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    match err {
        ConversionError::ConverterFailed { code, stderr } => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "Error: source file could not be loaded");
        }
        other => panic!("expected ConverterFailed, got {other:?}"),
    }
    assert!(!fx.docs.join("broken.docx").exists());
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_zero_exit_without_output_is_silent_failure() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", "printf 'warn: nothing to do' >&2\nexit 0");
    let source = fx.source("empty.pdf");

    let err = fx
        .service(fx.config(), &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Excel),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    match err {
        ConversionError::SilentFailure {
            code,
            stderr,
            listing,
        } => {
            assert_eq!(code, 0);
            assert_eq!(stderr, "warn: nothing to do");
            assert!(listing.is_empty());
        }
        other => panic!("expected SilentFailure, got {other:?}"),
    }
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_two_outputs_prefer_target_extension() {
    let fx = Fixture::new();
    let stub = fx.stub(
        "soffice",
        r#"printf 'table' > "$outdir/sheet.xlsx"
sleep 1
printf 'log' > "$outdir/convert.log""#,
    );
    let source = fx.source("sheet.pdf");

    let destination = fx
        .service(fx.config(), &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Excel),
            CancellationToken::new(),
        )
        .await
        .expect("convert");

    assert_eq!(std::fs::read(&destination).expect("read"), b"table");
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_two_outputs_strict_policy_is_ambiguous() {
    let fx = Fixture::new();
    let stub = fx.stub(
        "soffice",
        r#"printf 'a' > "$outdir/a.docx"
printf 'b' > "$outdir/b.docx""#,
    );
    let source = fx.source("twice.pdf");
    let config = ConverterConfig {
        output_policy: OutputPolicy::Strict,
        ..fx.config()
    };

    let err = fx
        .service(config, &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    match err {
        ConversionError::AmbiguousOutput { candidates } => {
            assert_eq!(candidates, vec!["a.docx", "b.docx"]);
        }
        other => panic!("expected AmbiguousOutput, got {other:?}"),
    }
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_zero_byte_output_is_rejected() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", r#": > "$outdir/out.docx""#);
    let source = fx.source("blank.pdf");

    let err = fx
        .service(fx.config(), &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    assert!(matches!(err, ConversionError::EmptyArtifact { size: 0, min: 1, .. }));
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_second_run_overwrites_destination() {
    let fx = Fixture::new();
    let state = fx.docs.join("next-output.txt");
    let stub = fx.stub(
        "soffice",
        &format!(r#"cat "{}" > "$outdir/result.docx""#, state.display()),
    );
    let source = fx.source("memo.pdf");
    let destination = fx.docs.join("final").join("memo.docx");
    let service = fx.service(fx.config(), &stub);

    for content in ["first run, longer content", "second run"] {
        std::fs::write(&state, content).expect("write state");
        service
            .convert(
                ConversionRequest::new(&source, TargetFormat::Word, &destination),
                CancellationToken::new(),
            )
            .await
            .expect("convert");
    }

    assert_eq!(std::fs::read_to_string(&destination).expect("read"), "second run");
    assert_eq!(service.metrics_snapshot().succeeded, 2);
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_report_to_excel_in_new_directory() {
    let fx = Fixture::new();
    let stub = fx.stub(
        "soffice",
        r#"[ "$token" = "xlsx" ] || exit 9
name=$(basename "$input" .pdf)
printf 'PK-xlsx-bytes' > "$outdir/$name.$token""#,
    );
    let source = fx.source("report.pdf");
    let destination = fx.docs.join("out").join("report.xlsx");

    let report = fx
        .service(fx.config(), &stub)
        .convert_with_report(
            ConversionRequest::new(&source, TargetFormat::Excel, &destination),
            CancellationToken::new(),
        )
        .await
        .expect("convert");

    assert_eq!(report.destination, destination);
    assert_eq!(report.size, 13);
    assert_eq!(std::fs::read(&destination).expect("read"), b"PK-xlsx-bytes");
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_relocate_failure_removes_workspace() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", r#"printf 'converted' > "$outdir/out.docx""#);
    let source = fx.source("blocked.pdf");
    let blocker = fx.docs.join("not-a-directory");
    std::fs::write(&blocker, b"plain file").expect("write blocker");
    let service = fx.service(fx.config(), &stub);

    let err = service
        .convert(
            ConversionRequest::new(&source, TargetFormat::Word, blocker.join("out.docx")),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    assert_eq!(err.code(), "RELOCATE_IO_ERROR");
    assert_eq!(*service.subscribe().borrow(), Phase::Failed);
    assert_eq!(std::fs::read(&blocker).expect("read"), b"plain file");
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_launch_failure_removes_workspace() {
    let fx = Fixture::new();
    let stub = fx.bin.join("soffice");
    std::fs::write(&stub, "#!/nonexistent/interpreter\nexit 0\n").expect("write stub");
    std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    let source = fx.source("unlaunchable.pdf");
    let service = fx.service(fx.config(), &stub);

    let err = service
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    assert_eq!(err.code(), "LAUNCH_ERROR");
    assert!(!fx.docs.join("unlaunchable.docx").exists());
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_missing_converter_creates_no_workspace() {
    let fx = Fixture::new();
    let source = fx.source("lonely.pdf");
    let service = ConversionService::new(fx.config()).with_locator(
        ConverterLocator::with_candidates(
            ConverterKind::Office,
            vec![fx.bin.join("soffice"), fx.bin.join("libreoffice")],
        ),
    );

    let err = service
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    match err {
        ConversionError::ConverterNotFound { searched, .. } => assert_eq!(searched.len(), 2),
        other => panic!("expected ConverterNotFound, got {other:?}"),
    }
    assert!(!fx.scratch.exists());
}

#[tokio::test]
async fn test_timeout_kills_hanging_converter() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", "exec sleep 30");
    let source = fx.source("slow.pdf");
    let config = ConverterConfig {
        timeout_seconds: 1,
        ..fx.config()
    };

    let start = Instant::now();
    let err = fx
        .service(config, &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must time out");

    assert!(matches!(err, ConversionError::Timeout { timeout_seconds: 1 }));
    assert!(start.elapsed() < Duration::from_secs(15));
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_cancellation_kills_converter() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", "exec sleep 30");
    let source = fx.source("abandoned.pdf");
    let service = fx.service(fx.config(), &stub);
    let mut status = service.subscribe();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        let _ = status.wait_for(|phase| *phase == Phase::Converting).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = service
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            cancel,
        )
        .await
        .expect_err("must be cancelled");

    assert!(matches!(err, ConversionError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(15));
    assert_eq!(service.metrics_snapshot().cancelled, 1);
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_paths_with_spaces_are_single_arguments() {
    let fx = Fixture::new();
    let stub = fx.stub(
        "soffice",
        r#"printf '%s|%s' "$token" "$input" > "$outdir/args.docx""#,
    );
    let source = fx.source("my docs/annual report (final).pdf");
    let destination = fx.docs.join("out dir").join("annual report.docx");

    fx.service(fx.config(), &stub)
        .convert(
            ConversionRequest::new(&source, TargetFormat::Word, &destination),
            CancellationToken::new(),
        )
        .await
        .expect("convert");

    let seen = std::fs::read_to_string(&destination).expect("read");
    assert_eq!(seen, format!("docx|{}", source.display()));
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_concurrent_request_is_busy() {
    let fx = Fixture::new();
    let stub = fx.stub("soffice", "exec sleep 30");
    let first_source = fx.source("first.pdf");
    let second_source = fx.source("second.pdf");
    let service = Arc::new(fx.service(fx.config(), &stub));
    let mut status = service.subscribe();

    let cancel = CancellationToken::new();
    let running = {
        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            service
                .convert(
                    ConversionRequest::beside_source(&first_source, TargetFormat::Word),
                    cancel,
                )
                .await
        })
    };

    status
        .wait_for(|phase| *phase == Phase::Converting)
        .await
        .expect("status channel open");

    let err = service
        .convert(
            ConversionRequest::beside_source(&second_source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect_err("must be busy");
    assert!(matches!(err, ConversionError::Busy));

    cancel.cancel();
    let first = running.await.expect("join");
    assert!(matches!(first, Err(ConversionError::Cancelled)));

    let snap = service.metrics_snapshot();
    assert_eq!(snap.started, 1);
    assert_eq!(snap.rejected_busy, 1);
    fx.assert_no_workspace();
}

#[tokio::test]
async fn test_python_backend_runs_generated_script() {
    let fx = Fixture::new();
    let stub = fx.stub("python3", r#"cp "$script" "$outdir/helper.docx""#);
    let source = fx.source("scan.pdf");
    let config = ConverterConfig {
        kind: ConverterKind::Python,
        ..fx.config()
    };

    let destination = fx
        .service(config, &stub)
        .convert(
            ConversionRequest::beside_source(&source, TargetFormat::Word),
            CancellationToken::new(),
        )
        .await
        .expect("convert");

    let copied = std::fs::read_to_string(&destination).expect("read");
    assert_eq!(copied, ScriptingEngine::helper_source());
    fx.assert_no_workspace();
}
