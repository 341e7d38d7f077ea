//! Launcher argument vector construction.
//!
//! The launcher is always given a flat argument vector, never a shell
//! string:
//!
//! ```text
//! mvscmd --pgm=IDCAMS --args=MARGINS(1,72) --sysin=MVSRAW.MVSRAW.P... --sysprint=stdout
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::binding::Binding;
use crate::config::LauncherConfig;
use crate::error::{MvsRawError, Result};
use crate::provision::{Resolution, ResolvedBindings};
use crate::request::InvocationRequest;

/// A fully built launcher invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Launcher command followed by its arguments.
    pub argv: Vec<String>,
    /// Bytes piped to the launcher's standard input.
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    /// The launcher command.
    pub fn command(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the command.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}

/// Build the argument vector for `request` with the provisioned targets.
pub fn build_invocation(
    request: &InvocationRequest,
    resolved: &ResolvedBindings,
    launcher: &LauncherConfig,
) -> Result<Invocation> {
    if resolved.len() != request.bindings.len() {
        return Err(MvsRawError::InvalidRequest {
            reason: format!(
                "{} bindings but {} resolutions",
                request.bindings.len(),
                resolved.len()
            ),
        });
    }

    let command = if request.authorized {
        &launcher.authorized
    } else {
        &launcher.unauthorized
    };
    let mut argv = vec![command.clone(), format!("--pgm={}", request.program.trim())];
    if let Some(args) = &request.args {
        argv.push(format!("--args={args}"));
    }

    let mut seen = HashSet::new();
    let mut stdin = None;
    for (binding, resolution) in request.bindings.iter().zip(resolved.iter()) {
        let name = binding.name();
        if !seen.insert(name.to_uppercase()) {
            return Err(MvsRawError::invalid_binding(name, "DD name is used more than once"));
        }
        let target = match (binding, resolution) {
            (Binding::Dataset(_), Resolution::Datasets(names)) => {
                if names.is_empty() {
                    return Err(MvsRawError::invalid_binding(name, "no data set name to bind"));
                }
                names.join(":")
            }
            (Binding::InlineInput(_), Resolution::InlineDataset(dsn)) => dsn.clone(),
            (Binding::InlineInput(dd), Resolution::Stdin) => {
                if stdin.is_some() {
                    return Err(MvsRawError::invalid_binding(
                        name,
                        "only one inline input can be read from standard input",
                    ));
                }
                stdin = Some(dd.content.to_text().into_bytes());
                "stdin".to_string()
            }
            (Binding::Sysout(dd), Resolution::AsRequested) => {
                if dd.is_stdout() {
                    "stdout".to_string()
                } else {
                    format!("sysout={}", dd.class)
                }
            }
            (Binding::UssFile(dd), Resolution::AsRequested) => dd.path.display().to_string(),
            (Binding::Dummy(_), Resolution::AsRequested) => "dummy".to_string(),
            (binding, resolution) => {
                return Err(MvsRawError::invalid_binding(
                    name,
                    format!("{} cannot be bound to {resolution:?}", binding.kind()),
                ));
            }
        };
        argv.push(format!("--{name}={target}"));
    }

    if request.verbose {
        argv.push("--verbose=true".to_string());
    }
    if request.debug {
        argv.push("--debug=true".to_string());
    }

    Ok(Invocation { argv, stdin })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{DatasetBinding, InlineBinding, SysoutBinding, UssBinding};

    fn resolved(items: Vec<Resolution>) -> ResolvedBindings {
        items.into_iter().collect()
    }

    #[test]
    fn program_only() {
        let req = InvocationRequest::new("IEFBR14");
        let inv = build_invocation(&req, &ResolvedBindings::default(), &LauncherConfig::default())
            .unwrap();
        assert_eq!(inv.argv, ["mvscmd", "--pgm=IEFBR14"]);
        assert_eq!(inv.command(), "mvscmd");
        assert!(inv.stdin.is_none());
    }

    #[test]
    fn full_ordering() {
        let req = InvocationRequest::new("IDCAMS")
            .args("MARGINS(1,72)")
            .authorized(true)
            .verbose(true)
            .debug(true)
            .bind(DatasetBinding::new("sysut1", "A.B:C.D"))
            .bind(InlineBinding::text("sysin", "X"))
            .bind(SysoutBinding::new("sysprint"))
            .bind(SysoutBinding::new("sysout").class('A'))
            .bind(UssBinding::new("sysut2", "/tmp/out.txt"))
            .bind(Binding::dummy("sysut3"));
        let res = resolved(vec![
            Resolution::Datasets(vec!["A.B".into(), "C.D".into()]),
            Resolution::InlineDataset("MVSRAW.TEMP".into()),
            Resolution::AsRequested,
            Resolution::AsRequested,
            Resolution::AsRequested,
            Resolution::AsRequested,
        ]);
        let inv = build_invocation(&req, &res, &LauncherConfig::default()).unwrap();
        assert_eq!(
            inv.argv,
            [
                "mvscmdauth",
                "--pgm=IDCAMS",
                "--args=MARGINS(1,72)",
                "--sysut1=A.B:C.D",
                "--sysin=MVSRAW.TEMP",
                "--sysprint=stdout",
                "--sysout=sysout=A",
                "--sysut2=/tmp/out.txt",
                "--sysut3=dummy",
                "--verbose=true",
                "--debug=true",
            ]
        );
    }

    #[test]
    fn args_are_not_split() {
        let req = InvocationRequest::new("MYPGM").args("A B 'C D'");
        let inv = build_invocation(&req, &ResolvedBindings::default(), &LauncherConfig::default())
            .unwrap();
        assert_eq!(inv.args(), ["--pgm=MYPGM", "--args=A B 'C D'"]);
    }

    #[test]
    fn stdin_inline_carries_content() {
        let req = InvocationRequest::new("IDCAMS").bind(InlineBinding::lines("SYSIN", ["A", "B"]));
        let inv = build_invocation(
            &req,
            &resolved(vec![Resolution::Stdin]),
            &LauncherConfig::default(),
        )
        .unwrap();
        assert_eq!(inv.argv[2], "--SYSIN=stdin");
        assert_eq!(inv.stdin.as_deref(), Some(&b"A\nB"[..]));
    }

    #[test]
    fn second_stdin_rejected() {
        let req = InvocationRequest::new("IDCAMS")
            .bind(InlineBinding::text("SYSIN", "A"))
            .bind(InlineBinding::text("SYSIN2", "B"));
        let err = build_invocation(
            &req,
            &resolved(vec![Resolution::Stdin, Resolution::Stdin]),
            &LauncherConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidBinding { ref name, .. } if name == "SYSIN2"));
    }

    #[test]
    fn empty_data_set_list_rejected() {
        let req = InvocationRequest::new("IEFBR14").bind(DatasetBinding::new("DD1", ""));
        let err = build_invocation(
            &req,
            &resolved(vec![Resolution::Datasets(Vec::new())]),
            &LauncherConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidBinding { .. }));
    }

    #[test]
    fn duplicate_names_rejected() {
        let req = InvocationRequest::new("IEFBR14")
            .bind(Binding::dummy("DD1"))
            .bind(Binding::dummy("dd1"));
        let err = build_invocation(
            &req,
            &resolved(vec![Resolution::AsRequested, Resolution::AsRequested]),
            &LauncherConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidBinding { .. }));
    }

    #[test]
    fn mismatched_resolution_rejected() {
        let req = InvocationRequest::new("IEFBR14").bind(Binding::dummy("DD1"));
        let err = build_invocation(
            &req,
            &resolved(vec![Resolution::Stdin]),
            &LauncherConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MvsRawError::InvalidBinding { .. }));
    }
}
