//! Helper script generation for the Python converter.
//!
//! The script mirrors the office suite's command line
//! (`--headless --convert-to <token> --outdir <dir> <input>`) so both
//! converters share argument construction and output discovery.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// File name of the generated helper inside the workspace staging directory.
const SCRIPT_NAME: &str = "pdfsuper_convert.py";

/// Helper script body. Word output uses `pdf2docx`; Excel output extracts
/// every table with `pdfplumber` and concatenates them with `pandas`.
const HELPER_SCRIPT: &str = r#"import argparse
import os
import sys


def to_docx(pdf_file, out_file):
    from pdf2docx import Converter

    cv = Converter(pdf_file)
    try:
        cv.convert(out_file, start=0, end=None)
    finally:
        cv.close()


def to_xlsx(pdf_file, out_file):
    import pandas as pd
    import pdfplumber

    frames = []
    with pdfplumber.open(pdf_file) as pdf:
        for page in pdf.pages:
            for table in page.extract_tables():
                if not table:
                    continue
                frames.append(pd.DataFrame(table[1:], columns=table[0]))

    if not frames:
        print("No tables were detected in the PDF.", file=sys.stderr)
        sys.exit(1)

    pd.concat(frames, ignore_index=True).to_excel(out_file, index=False)


def main():
    parser = argparse.ArgumentParser()
    parser.add_argument("--headless", action="store_true")
    parser.add_argument("--convert-to", dest="token", required=True, choices=["docx", "xlsx"])
    parser.add_argument("--outdir", required=True)
    parser.add_argument("input")
    args, _unknown = parser.parse_known_args()

    stem = os.path.splitext(os.path.basename(args.input))[0]
    out_file = os.path.join(args.outdir, stem + "." + args.token)

    try:
        if args.token == "docx":
            to_docx(args.input, out_file)
        else:
            to_xlsx(args.input, out_file)
    except SystemExit:
        raise
    except Exception as e:
        print(f"ERROR: {e}", file=sys.stderr)
        sys.exit(1)


if __name__ == "__main__":
    main()
"#;

/// Writes converter helper scripts.
pub struct ScriptingEngine;

impl ScriptingEngine {
    /// Write the helper script into `staging_dir` and return its path.
    pub async fn write_helper(staging_dir: &Path) -> std::io::Result<PathBuf> {
        let script_path = staging_dir.join(SCRIPT_NAME);

        let mut file = tokio::fs::File::create(&script_path).await?;
        file.write_all(HELPER_SCRIPT.as_bytes()).await?;
        file.flush().await?;

        Ok(script_path)
    }

    /// The helper script source.
    pub fn helper_source() -> &'static str {
        HELPER_SCRIPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_helper() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = ScriptingEngine::write_helper(temp.path()).await.expect("write");

        assert_eq!(path.parent(), Some(temp.path()));
        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, ScriptingEngine::helper_source());
    }

    #[test]
    fn test_script_accepts_converter_flags() {
        let src = ScriptingEngine::helper_source();
        assert!(src.contains("\"--convert-to\""));
        assert!(src.contains("\"--outdir\""));
        assert!(src.contains("\"--headless\""));
        assert!(src.contains("from pdf2docx import Converter"));
        assert!(src.contains("pdfplumber"));
    }
}
