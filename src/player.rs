use std::process::{Command, ExitStatus, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::config::PlayerConfig;

const URL_PLACEHOLDER: &str = "%URL%";

/// Builds program and arguments from the configured command template. The URL
/// replaces every `%URL%` token, or is appended when the template has none.
pub fn command_line(template: &[String], url: &str) -> Result<(String, Vec<String>)> {
    let Some((program, rest)) = template.split_first() else {
        bail!("player: video command is empty");
    };
    if program.trim().is_empty() {
        bail!("player: video command has no program");
    }
    let mut substituted = false;
    let mut args: Vec<String> = rest
        .iter()
        .map(|arg| {
            if arg.contains(URL_PLACEHOLDER) {
                substituted = true;
                arg.replace(URL_PLACEHOLDER, url)
            } else {
                arg.clone()
            }
        })
        .collect();
    if !substituted {
        args.push(url.to_string());
    }
    Ok((program.clone(), args))
}

pub enum Launch {
    Detached,
    Finished(ExitStatus),
}

/// Terminal the player borrows while it runs in the foreground.
pub trait Screen {
    fn release(&mut self) -> Result<()>;
    fn reclaim(&mut self) -> Result<()>;
}

/// Runs `body` with the screen claimed and releases it again whatever happens.
pub fn with_screen<S: Screen + ?Sized, T>(
    screen: &mut S,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    screen.reclaim()?;
    let result = body();
    let released = screen.release();
    let value = result?;
    released?;
    Ok(value)
}

pub fn launch(cfg: &PlayerConfig, url: &str, screen: &mut dyn Screen) -> Result<Launch> {
    if url.trim().is_empty() {
        return Err(anyhow!("player: embed link missing"));
    }
    let (program, args) = command_line(&cfg.video_command, url)?;
    tracing::info!(%program, ?args, detach = cfg.video_detach, "launching external player");

    let mut command = Command::new(&program);
    command.args(&args);

    if cfg.video_detach {
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        command
            .spawn()
            .with_context(|| format!("launch {program} for {url}"))?;
        return Ok(Launch::Detached);
    }

    // Attached players get the real terminal until they exit.
    screen.release()?;
    let status = command
        .status()
        .with_context(|| format!("run {program} for {url}"));
    let reclaimed = screen.reclaim();
    let status = status?;
    reclaimed?;
    Ok(Launch::Finished(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn substitutes_url_placeholder() {
        let (program, args) =
            command_line(&template(&["mpv", "--fs", "%URL%"]), "https://v.test/a").unwrap();
        assert_eq!(program, "mpv");
        assert_eq!(args, ["--fs", "https://v.test/a"]);
    }

    #[test]
    fn substitutes_inside_larger_argument() {
        let (_, args) =
            command_line(&template(&["vlc", "--input=%URL%"]), "https://v.test/a").unwrap();
        assert_eq!(args, ["--input=https://v.test/a"]);
    }

    #[test]
    fn appends_url_without_placeholder() {
        let (_, args) = command_line(&template(&["open"]), "https://v.test/a").unwrap();
        assert_eq!(args, ["https://v.test/a"]);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(command_line(&[], "https://v.test/a").is_err());
        assert!(command_line(&template(&[" "]), "https://v.test/a").is_err());
    }

    #[derive(Default)]
    struct RecordingScreen {
        calls: Vec<&'static str>,
        fail_reclaim: bool,
    }

    impl Screen for RecordingScreen {
        fn release(&mut self) -> Result<()> {
            self.calls.push("release");
            Ok(())
        }

        fn reclaim(&mut self) -> Result<()> {
            self.calls.push("reclaim");
            if self.fail_reclaim {
                bail!("no tty");
            }
            Ok(())
        }
    }

    fn attached(program: &str) -> PlayerConfig {
        PlayerConfig {
            video_command: template(&[program]),
            video_detach: false,
        }
    }

    #[test]
    fn launch_requires_url() {
        let mut screen = RecordingScreen::default();
        assert!(launch(&PlayerConfig::default(), "  ", &mut screen).is_err());
        assert!(screen.calls.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn attached_player_borrows_the_screen() {
        let mut screen = RecordingScreen::default();
        match launch(&attached("true"), "https://v.test/a", &mut screen).unwrap() {
            Launch::Finished(status) => assert!(status.success()),
            Launch::Detached => panic!("expected the player to be waited on"),
        }
        assert_eq!(screen.calls, ["release", "reclaim"]);
    }

    #[test]
    fn failed_attached_launch_still_reclaims_screen() {
        let mut screen = RecordingScreen::default();
        let result = launch(
            &attached("movie-shelf-no-such-player"),
            "https://v.test/a",
            &mut screen,
        );
        assert!(result.is_err());
        assert_eq!(screen.calls, ["release", "reclaim"]);
    }

    #[test]
    fn with_screen_releases_after_body_error() {
        let mut screen = RecordingScreen::default();
        let result: Result<()> = with_screen(&mut screen, || Err(anyhow!("draw failed")));
        assert!(result.is_err());
        assert_eq!(screen.calls, ["reclaim", "release"]);
    }

    #[test]
    fn with_screen_skips_body_when_claim_fails() {
        let mut screen = RecordingScreen {
            fail_reclaim: true,
            ..RecordingScreen::default()
        };
        let mut ran = false;
        let result = with_screen(&mut screen, || {
            ran = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!ran);
        assert_eq!(screen.calls, ["reclaim"]);
    }
}
