use super::output::{
    parse_add_result, parse_fields, parse_first_identity, parse_table, MAX_OUTPUT_BYTES,
};
use crate::client::{AddBundleResult, AddOptions, BundleStore, IdentitySource};
use crate::errors::{bad_list_args, io_error, malformed_output, store_failure, Result};
use bundlegate_core::{BundleId, BundleTable, SubscriberId};
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Environment variable naming the daemon's instance directory
pub const INSTANCE_PATH_ENV: &str = "SERVALINSTANCE_PATH";

/// Longest stderr excerpt carried into an error message
const MAX_STDERR_EXCERPT: usize = 512;

/// Stderr kept in memory; the rest is drained and discarded
const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// Store client that shells out to the daemon's control binary
#[derive(Debug, Clone)]
pub struct ServaldClient {
    binary: PathBuf,
    instance_path: Option<PathBuf>,
}

impl ServaldClient {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            instance_path: None,
        }
    }

    pub fn with_instance_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.instance_path = Some(path.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run one control command and return its stdout
    fn run(&self, op: &str, args: &[OsString]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        if let Some(instance) = &self.instance_path {
            cmd.env(INSTANCE_PATH_ENV, instance);
        }

        tracing::debug!(
            op,
            binary = %self.binary.display(),
            argc = args.len(),
            "Invoking store control command"
        );

        collect_output(op, &self.binary, cmd, MAX_OUTPUT_BYTES)
    }
}

/// Run `cmd`, reading at most `limit` bytes of stdout
///
/// The child is killed as soon as it prints more than `limit` bytes.
/// Stderr is read on a helper thread so neither pipe can fill and stall it.
fn collect_output(op: &str, binary: &Path, mut cmd: Command, limit: usize) -> Result<Vec<u8>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| io_error(op, e))?;

    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut kept = Vec::new();
            let _ = (&mut stderr).take(MAX_STDERR_BYTES).read_to_end(&mut kept);
            let _ = io::copy(&mut stderr, &mut io::sink());
            kept
        })
    });

    let mut stdout = Vec::new();
    let read = match child.stdout.take() {
        Some(pipe) => pipe
            .take(limit as u64 + 1)
            .read_to_end(&mut stdout)
            .map(|_| ()),
        None => Ok(()),
    };
    if stdout.len() > limit {
        let _ = child.kill();
        let _ = child.wait();
        return Err(malformed_output(
            op,
            format!("more than {} bytes on stdout", limit),
        ));
    }
    if let Err(e) = read {
        let _ = child.kill();
        let _ = child.wait();
        return Err(io_error(op, e));
    }

    let status = child.wait().map_err(|e| io_error(op, e))?;
    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        let excerpt: String = stderr.trim().chars().take(MAX_STDERR_EXCERPT).collect();
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(store_failure(
            op,
            format!("{} exited with status {}: {}", binary.display(), code, excerpt),
        ));
    }
    Ok(stdout)
}

fn path_arg(path: Option<&Path>) -> OsString {
    path.map(|p| p.as_os_str().to_os_string())
        .unwrap_or_default()
}

/// `rhizome add file <author> <payload> <manifest> [<secret>]`
///
/// Absent positional values are passed as empty strings.
pub(crate) fn add_args(
    payload: Option<&Path>,
    manifest: Option<&Path>,
    author: Option<&SubscriberId>,
    options: Option<&AddOptions>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["rhizome".into(), "add".into(), "file".into()];
    args.push(author.map(|a| a.to_hex()).unwrap_or_default().into());
    args.push(path_arg(payload));
    args.push(path_arg(manifest));
    if let Some(secret) = options.and_then(|o| o.bundle_secret.as_ref()) {
        args.push(secret.expose().into());
    }
    args
}

pub(crate) fn list_args(filters: &[String]) -> Result<Vec<OsString>> {
    if let Some(bad) = filters.iter().find(|f| f.contains('\0')) {
        return Err(bad_list_args(format!(
            "list argument contains NUL: {:?}",
            bad
        )));
    }
    let mut args: Vec<OsString> = vec!["rhizome".into(), "list".into()];
    args.extend(filters.iter().map(OsString::from));
    Ok(args)
}

fn extract_args(what: &str, id: &BundleId, dest: &Path) -> Vec<OsString> {
    vec![
        "rhizome".into(),
        "extract".into(),
        what.into(),
        id.to_hex().into(),
        dest.as_os_str().to_os_string(),
    ]
}

impl BundleStore for ServaldClient {
    fn add_bundle(
        &self,
        payload: Option<&Path>,
        manifest: Option<&Path>,
        author: Option<&SubscriberId>,
        options: Option<&AddOptions>,
    ) -> Result<AddBundleResult> {
        let op = "rhizome_add";
        let stdout = self.run(op, &add_args(payload, manifest, author, options))?;
        let fields = parse_fields(op, &stdout)?;
        parse_add_result(op, &fields)
    }

    fn list_bundles(&self, args: &[String]) -> Result<BundleTable> {
        let op = "rhizome_list";
        let stdout = self.run(op, &list_args(args)?).map_err(|e| {
            // the daemon rejects malformed filters with a non-zero exit
            bad_list_args(e.message().to_string()).with_source(e)
        })?;
        parse_table(op, &stdout)
    }

    fn extract_payload(&self, id: &BundleId, dest: &Path) -> Result<()> {
        let op = "rhizome_extract_file";
        self.run(op, &extract_args("file", id, dest))
            .map_err(|e| e.with_bundle_id(id.to_hex()))?;
        Ok(())
    }

    fn extract_manifest(&self, id: &BundleId, dest: &Path) -> Result<()> {
        let op = "rhizome_extract_manifest";
        self.run(op, &extract_args("manifest", id, dest))
            .map_err(|e| e.with_bundle_id(id.to_hex()))?;
        Ok(())
    }
}

impl IdentitySource for ServaldClient {
    fn default_author(&self) -> Result<Option<SubscriberId>> {
        let op = "keyring_list";
        let stdout = self.run(op, &["keyring".into(), "list".into()])?;
        parse_first_identity(op, &stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlegate_core::GwErrorKind;
    use bundlegate_core_types::Sensitive;

    #[test]
    fn test_add_args_with_everything() {
        let sid = SubscriberId::from_bytes([1; 32]);
        let opts = AddOptions {
            bundle_secret: Some(Sensitive::new("5EC2E7".to_string())),
        };
        let args = add_args(
            Some(Path::new("/p.bin")),
            Some(Path::new("/m")),
            Some(&sid),
            Some(&opts),
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "rhizome".to_string(),
                "add".to_string(),
                "file".to_string(),
                "01".repeat(32),
                "/p.bin".to_string(),
                "/m".to_string(),
                "5EC2E7".to_string(),
            ]
        );
    }

    #[test]
    fn test_add_args_absent_values_are_empty() {
        let args = add_args(None, Some(Path::new("/m")), None, None);
        assert_eq!(args.len(), 6);
        assert!(args[3].is_empty());
        assert!(args[4].is_empty());
        assert_eq!(args[5], OsString::from("/m"));
    }

    #[test]
    fn test_list_args_forwarded_verbatim() {
        let args = list_args(&["file".to_string(), "".to_string()]).unwrap();
        assert_eq!(args.len(), 4);
        assert_eq!(args[2], OsString::from("file"));
        assert!(args[3].is_empty());
    }

    #[test]
    fn test_list_args_rejects_nul() {
        let err = list_args(&["a\0b".to_string()]).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let client = ServaldClient::new("/nonexistent/bundlegate-test-servald");
        let err = client.list_bundles(&[]).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::InvalidInput);
        assert_eq!(
            err.source_error().map(|e| e.kind()),
            Some(GwErrorKind::Io)
        );

        let err = client
            .extract_payload(&BundleId::from_bytes([2; 32]), Path::new("/tmp/x"))
            .unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::Io);
        assert_eq!(err.bundle_id(), Some("02".repeat(32).as_str()));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[cfg(unix)]
    #[test]
    fn test_oversized_stdout_is_cut_off() {
        let cmd = shell("yes bundle | head -c 1000000");
        let err = collect_output("rhizome_list", Path::new("sh"), cmd, 1024).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::ExternalService);
        assert!(err.message().contains("more than 1024 bytes"), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_at_limit_is_kept() {
        let cmd = shell("printf 'abcd'");
        let stdout = collect_output("rhizome_list", Path::new("sh"), cmd, 4).unwrap();
        assert_eq!(stdout, b"abcd");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_status_and_stderr() {
        let cmd = shell("echo 'no such bundle' >&2; exit 3");
        let err =
            collect_output("rhizome_extract_file", Path::new("sh"), cmd, 1024).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::ExternalService);
        assert!(err.message().contains("status 3"), "{}", err);
        assert!(err.message().contains("no such bundle"), "{}", err);
    }
}
