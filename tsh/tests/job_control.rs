use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn run_tsh(script: &str) -> std::process::Output {
    run_tsh_with(&["-p"], script)
}

fn run_tsh_with(args: &[&str], script: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tsh"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to execute tsh");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(script.as_bytes())
        .expect("write script");
    child.wait_with_output().expect("wait for tsh")
}

fn stdout_lines(output: &std::process::Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// `jobs` output lines look like `[1] (1234) Running cmd`.
fn job_lines(lines: &[String]) -> Vec<&String> {
    lines
        .iter()
        .filter(|line| {
            line.starts_with('[')
                && ["Running", "Stopped", "Foreground"]
                    .iter()
                    .any(|state| line.contains(state))
        })
        .collect()
}

/// Pid inside the first `(...)` of a job line or notice.
fn pid_of(line: &str) -> i32 {
    let start = line.find('(').expect("no pid") + 1;
    let end = line[start..].find(')').expect("no pid") + start;
    line[start..end].parse().expect("pid is a number")
}

/// A running shell driven line by line, for tests that signal the shell.
struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    fn start() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_tsh"))
            .args(["-p", "-v"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to execute tsh");
        let stdin = child.stdin.take().expect("stdin");
        let stdout = BufReader::new(child.stdout.take().expect("stdout"));
        let mut session = Session {
            child,
            stdin,
            stdout,
        };
        // handlers are installed before the first line is read
        session.sync();
        session
    }

    fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    fn send(&mut self, line: &str) {
        writeln!(self.stdin, "{line}").expect("write line");
        self.stdin.flush().expect("flush");
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line).expect("read line");
        assert!(n > 0, "tsh closed its output unexpectedly");
        line.trim_end().to_string()
    }

    /// Reads until a line starting with `prefix`, returning that line.
    fn expect_prefix(&mut self, prefix: &str) -> String {
        loop {
            let line = self.read_line();
            if line.starts_with(prefix) {
                return line;
            }
        }
    }

    /// Round-trips a marker through the shell and returns everything
    /// printed before it.
    fn sync(&mut self) -> Vec<String> {
        self.send("/bin/echo __sync__");
        let mut lines = Vec::new();
        loop {
            let line = self.read_line();
            if line == "__sync__" {
                return lines;
            }
            if !line.starts_with("Added job") {
                lines.push(line);
            }
        }
    }

    fn jobs(&mut self) -> Vec<String> {
        self.send("jobs");
        self.sync()
    }

    fn signal(&self, signal: Signal) {
        kill(self.pid(), signal).expect("signal tsh");
    }

    fn finish(mut self) -> std::process::ExitStatus {
        self.send("quit");
        drop(self.stdin);
        self.child.wait().expect("wait for tsh")
    }
}

#[test]
fn background_job_is_listed() {
    let output = run_tsh("/bin/sleep 1 &\njobs\n");
    assert!(output.status.success(), "tsh failed: {:?}", output);
    let lines = stdout_lines(&output);

    let launched = lines
        .iter()
        .find(|line| line.starts_with("[1] (") && line.ends_with(") /bin/sleep 1 &"))
        .expect("background launch report");
    let jobs = job_lines(&lines);
    assert_eq!(jobs.len(), 1, "{lines:?}");
    assert_eq!(pid_of(jobs[0]), pid_of(launched));
    assert!(jobs[0].ends_with("Running /bin/sleep 1 &"), "{lines:?}");
}

#[test]
fn verbose_reports_stay_on_their_own_lines() {
    let script = "/bin/echo tick &\n/bin/echo tock\n".repeat(20);
    let output = run_tsh_with(&["-p", "-v"], &script);
    assert!(output.status.success());
    let lines = stdout_lines(&output);

    for line in &lines {
        let whole = line == "tick"
            || line == "tock"
            || line == "Tried to create too many jobs"
            || (line.starts_with("Added job [")
                && (line.ends_with(" /bin/echo tick &") || line.ends_with(" /bin/echo tock")))
            || (line.starts_with('[') && line.ends_with(") /bin/echo tick &"));
        assert!(whole, "mixed output line {line:?} in {lines:?}");
    }
    assert_eq!(lines.iter().filter(|line| *line == "tock").count(), 20);
}

#[test]
fn foreground_job_runs_to_completion() {
    let output = run_tsh("/bin/echo hello\njobs\n/bin/echo 'two words'\n");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines, vec!["hello", "two words"]);
}

#[test]
fn killed_foreground_job_is_removed() {
    let output = run_tsh("/bin/sh -c 'kill -KILL $$'\njobs\n");
    let lines = stdout_lines(&output);
    assert!(
        lines
            .iter()
            .any(|line| line.starts_with("Job [1] (") && line.ends_with("terminated by signal 9")),
        "{lines:?}"
    );
    assert!(job_lines(&lines).is_empty(), "{lines:?}");
}

#[test]
fn stopped_foreground_job_stays_in_table() {
    let output = run_tsh("/bin/sh -c 'kill -STOP $$'\njobs\n");
    let lines = stdout_lines(&output);
    let notice = lines
        .iter()
        .find(|line| line.starts_with("Job [1] (") && line.ends_with("stopped by signal 19"))
        .expect("stop notice");
    let jobs = job_lines(&lines);
    assert_eq!(jobs.len(), 1, "{lines:?}");
    assert_eq!(pid_of(jobs[0]), pid_of(notice));
    assert!(jobs[0].contains("Stopped"), "{lines:?}");
}

#[test]
fn fg_resumes_stopped_job() {
    let output = run_tsh("/bin/sh -c 'kill -STOP $$; echo resumed'\nfg %1\njobs\n");
    let lines = stdout_lines(&output);
    assert!(lines.iter().any(|line| line == "resumed"), "{lines:?}");
    assert!(job_lines(&lines).is_empty(), "{lines:?}");
}

#[test]
fn bg_and_fg_report_bad_arguments() {
    let output = run_tsh("fg\nbg abc\nfg %3\nbg 999999\n");
    let lines = stdout_lines(&output);
    assert_eq!(
        lines,
        vec![
            "fg command requires PID or %jobid argument",
            "bg: argument must be a PID or %jobid",
            "%3: No such job",
            "(999999): No such process",
        ]
    );
}

#[test]
fn missing_command_is_reported_by_child() {
    let output = run_tsh("/definitely/not/here\njobs\n/bin/echo still here\n");
    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(
        lines,
        vec!["/definitely/not/here: Command not found", "still here"]
    );
}

#[test]
fn quit_stops_reading_input() {
    let output = run_tsh("quit\n/bin/echo after\n");
    assert!(output.status.success());
    assert!(stdout_lines(&output).is_empty());
}

#[test]
fn full_table_rejects_new_jobs() {
    let script = "/bin/sleep 5 &\n".repeat(17) + "jobs\n";
    let output = run_tsh(&script);
    let lines = stdout_lines(&output);
    assert!(
        lines
            .iter()
            .any(|line| line == "Tried to create too many jobs"),
        "{lines:?}"
    );
    let jobs = job_lines(&lines);
    assert_eq!(jobs.len(), 16, "{lines:?}");
    let mut ids: Vec<&str> = jobs
        .iter()
        .map(|line| &line[1..line.find(']').unwrap()])
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

#[test]
fn interrupt_reaches_foreground_job() {
    let mut session = Session::start();
    session.send("/bin/sleep 30");
    let added = session.expect_prefix("Added job [1]");
    session.signal(Signal::SIGINT);

    let notice = session.expect_prefix("Job [1]");
    assert!(notice.ends_with("terminated by signal 2"), "{notice}");
    assert!(added.contains(&format!(" {} ", pid_of(&notice))), "{added}");

    assert!(job_lines(&session.jobs()).is_empty());
    assert!(session.finish().success());
}

#[test]
fn suspend_stops_foreground_job_then_bg_resumes_it() {
    let mut session = Session::start();
    session.send("/bin/sleep 30");
    session.expect_prefix("Added job [1]");
    session.signal(Signal::SIGTSTP);

    let notice = session.expect_prefix("Job [1]");
    assert!(notice.ends_with("stopped by signal 20"), "{notice}");
    let pid = pid_of(&notice);

    let jobs = session.jobs();
    assert_eq!(
        job_lines(&jobs),
        vec![&format!("[1] ({pid}) Stopped /bin/sleep 30")]
    );

    session.send("bg %1");
    let resumed = session.sync();
    assert_eq!(resumed, vec![format!("[1] ({pid}) /bin/sleep 30")]);

    let jobs = session.jobs();
    assert_eq!(
        job_lines(&jobs),
        vec![&format!("[1] ({pid}) Running /bin/sleep 30")]
    );
    assert!(session.finish().success());
}

#[test]
fn interrupt_without_foreground_job_changes_nothing() {
    let mut session = Session::start();
    session.send("/bin/sleep 30 &");
    let before = job_lines(&session.jobs())
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(before.len(), 1);

    session.signal(Signal::SIGINT);
    session.signal(Signal::SIGTSTP);

    let after = job_lines(&session.jobs())
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(before, after);
    assert!(session.finish().success());
}

#[test]
fn sigquit_terminates_the_shell() {
    let mut session = Session::start();
    session.signal(Signal::SIGQUIT);
    assert_eq!(
        session.read_line(),
        "Terminating after receipt of SIGQUIT signal"
    );
    let status = session.child.wait().expect("wait for tsh");
    assert_eq!(status.code(), Some(1));
}
