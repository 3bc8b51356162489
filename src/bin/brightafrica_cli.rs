//!
//! BrightAfrica Academy CLI
//! ------------------------
//! Command-line client for the BrightAfrica Academy platform API. Signs in,
//! keeps the session fresh across calls, and exposes the enrollment, class,
//! progress and teacher-onboarding operations as interactive commands.

use std::env;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use brightafrica::api::enrollments::already_enrolled;
use brightafrica::api::meetings::CLASS_DURATION;
use brightafrica::api::payments::{ENROLLMENT_FEE, TEACHER_FEE};
use brightafrica::api::rooms::assigned_rooms;
use brightafrica::cli::print_records;
use brightafrica::models::{OtpPurpose, RegisterForm, SUBJECTS};
use brightafrica::{ApiClient, ClientConfig};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api-url <url>] [--state-dir <dir>] [--timeout-ms <ms>] [-c \"<command>\"] [--repl]\n\nFlags:\n  --api-url <url>      Backend origin (default: ${{BRIGHTAFRICA_API_URL}})\n  --state-dir <dir>    Directory for the persisted access token\n  --timeout-ms <ms>    Per-request deadline in milliseconds\n  -c, --command <cmd>  Run a one-shot command; without it the shell starts\n  --repl               Start the shell even after a one-shot command\n  -h, --help           Show this help\n\nCommands:\n  login <email> <password>            sign in\n  logout                              sign out everywhere\n  whoami                              re-fetch the signed-in user\n  register <user> <email> <pass> <country> <city> <M|F> <tel>\n  verify <email> <code>               confirm the emailed OTP\n  resend <email>                      resend the OTP\n  forgot <email>                      request a password-reset code\n  reset <email> <code> <newpass>      reset the password\n  rooms                               list joinable classes\n  enroll <room-id>                    enroll in a class (fee ${ENROLLMENT_FEE})\n  enrollments                         list my enrollments\n  progress                            list my course progress\n  claim <progress-id>                 pay for and fetch a certificate\n  join <room-id>                      get a live-class join link\n  subjects                            list the subject catalogue\n  request-teacher <subject>...        apply to teach (fee ${TEACHER_FEE})\n  teacher-requests                    pending applications (admin)\n  approve <user-id> <subject>...      approve an application (admin)\n  teachers                            approved teachers (admin)\n  create-room <teacher-id> <subject>  create a teacher room (admin)\n  status                              connection and session info\n  help                                this help\n  quit | exit                         leave the shell"
    );
}

fn main() -> Result<()> {
    println!("BrightAfrica Academy - command line client");

    // Initialize tracing so transport errors are visible on the command line
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut api_url: Option<String> = None;
    let mut state_dir: Option<String> = None;
    let mut timeout_ms: Option<u64> = None;
    let mut command: Option<String> = None;
    let mut repl = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api-url" => {
                if i + 1 >= args.len() { eprintln!("--api-url requires a value"); print_usage(&program); std::process::exit(2); }
                api_url = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--state-dir" => {
                if i + 1 >= args.len() { eprintln!("--state-dir requires a value"); print_usage(&program); std::process::exit(2); }
                state_dir = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--timeout-ms" => {
                if i + 1 >= args.len() { eprintln!("--timeout-ms requires a value"); print_usage(&program); std::process::exit(2); }
                timeout_ms = Some(args[i + 1].parse().context("invalid --timeout-ms")?);
                i += 2; continue;
            }
            "--command" | "-c" => {
                if i + 1 >= args.len() { eprintln!("--command requires a value"); print_usage(&program); std::process::exit(2); }
                command = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--repl" => { repl = true; i += 1; continue; }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }

    let mut cfg = match api_url {
        Some(url) => ClientConfig::new(&url)?,
        None => ClientConfig::from_env()?,
    };
    if let Some(ms) = timeout_ms {
        cfg = cfg.with_timeout(std::time::Duration::from_millis(ms));
    }
    if let Some(dir) = state_dir {
        cfg = cfg.with_state_dir(dir);
    }

    // Tokio runtime: commands run one at a time, a current-thread runtime is enough
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let client = rt.block_on(async { ApiClient::new(cfg) })?;

    if client.is_authenticated() {
        println!("Resumed a persisted session; 'whoami' re-validates it.");
    }

    let had_command = command.is_some();
    if let Some(line) = command {
        run_command(&rt, &client, &line, &program);
    }
    if had_command && !repl {
        return Ok(());
    }

    println!("brightafrica shell. Type 'help' for commands.");
    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => { eprintln!("input error: {}", e); break; }
        };
        let line = line.trim().to_string();
        if line.is_empty() { continue; }
        let _ = rl.add_history_entry(&line);
        if matches!(line.to_lowercase().as_str(), "quit" | "exit") { break; }
        run_command(&rt, &client, &line, &program);
    }
    Ok(())
}

fn run_command(rt: &tokio::runtime::Runtime, client: &ApiClient, line: &str, program: &str) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&cmd) = parts.first() else { return };
    let args = &parts[1..];

    match cmd.to_lowercase().as_str() {
        "help" => print_usage(program),
        "status" => {
            let session = client.session();
            println!("api: {}", client.config().base_url);
            match (&session.user, &session.token) {
                (Some(u), _) => println!("signed in as {} <{}> ({})", u.username, u.email, u.role),
                (None, Some(_)) => println!("token present, user not yet validated ('whoami')"),
                (None, None) => println!("signed out"),
            }
        }
        "login" => {
            if args.len() < 2 { eprintln!("usage: login <email> <password>"); return; }
            match rt.block_on(client.login(args[0], args[1])) {
                Ok(user) => println!("signed in as {} ({})", user.username, user.role),
                Err(e) => eprintln!("login failed: {}", e.message()),
            }
        }
        "logout" => {
            rt.block_on(client.logout());
            println!("signed out");
        }
        "whoami" => match rt.block_on(client.me()) {
            Ok(user) => print_value(&user),
            Err(e) => eprintln!("error: {}", e.message()),
        },
        "register" => {
            if args.len() < 7 {
                eprintln!("usage: register <user> <email> <pass> <country> <city> <M|F> <tel>");
                return;
            }
            let form = RegisterForm {
                username: args[0].to_string(),
                email: args[1].to_string(),
                password: args[2].to_string(),
                country: args[3].to_string(),
                city: args[4].to_string(),
                gender: args[5].to_string(),
                tel: args[6].to_string(),
            };
            match rt.block_on(client.register(&form)) {
                Ok(()) => println!("account created; check your email for the OTP, then run: verify {} <code>", form.email),
                Err(e) => eprintln!("registration failed: {}", e.message()),
            }
        }
        "verify" => {
            if args.len() < 2 { eprintln!("usage: verify <email> <code>"); return; }
            match rt.block_on(client.verify_otp(args[0], args[1], OtpPurpose::Verification)) {
                Ok(()) => println!("account verified; you can sign in now"),
                Err(e) => eprintln!("verification failed: {}", e.message()),
            }
        }
        "resend" => {
            if args.is_empty() { eprintln!("usage: resend <email>"); return; }
            match rt.block_on(client.resend_otp(args[0], OtpPurpose::Verification)) {
                Ok(()) => println!("code resent (if the address exists)"),
                Err(e) => eprintln!("resend failed: {}", e.message()),
            }
        }
        "forgot" => {
            if args.is_empty() { eprintln!("usage: forgot <email>"); return; }
            match rt.block_on(client.request_code(args[0])) {
                Ok(()) => println!("reset code sent to {}", args[0]),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }
        "reset" => {
            if args.len() < 3 { eprintln!("usage: reset <email> <code> <newpass>"); return; }
            match rt.block_on(client.reset_password(args[0], args[1], args[2])) {
                Ok(()) => println!("password reset; sign in with the new password"),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }
        "rooms" => match rt.block_on(client.teacher_rooms()) {
            Ok(rooms) => print_list(&assigned_rooms(rooms)),
            Err(e) => eprintln!("error: {}", e.message()),
        },
        "enroll" => {
            if args.is_empty() { eprintln!("usage: enroll <room-id>"); return; }
            run_enroll(rt, client, args[0]);
        }
        "enrollments" => with_user(rt, client, |rt, client, user_id| {
            match rt.block_on(client.student_enrollments(&user_id)) {
                Ok(list) => print_list(&list),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }),
        "progress" => with_user(rt, client, |rt, client, user_id| {
            match rt.block_on(client.student_progress(&user_id)) {
                Ok(list) => print_list(&list),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }),
        "claim" => {
            if args.is_empty() { eprintln!("usage: claim <progress-id>"); return; }
            match rt.block_on(client.claim_certificate(args[0])) {
                Ok(()) => println!("certificate paid and issued; see 'progress'"),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }
        "join" => {
            if args.is_empty() { eprintln!("usage: join <room-id>"); return; }
            match rt.block_on(client.meeting_ticket(args[0])) {
                Ok(ticket) => {
                    println!("open this link to join the class:\n  {}", ticket.open_url());
                    println!("class ends after {} minutes", CLASS_DURATION.as_secs() / 60);
                }
                Err(e) => eprintln!("unable to join: {}", e.message()),
            }
        }
        "subjects" => {
            for s in SUBJECTS { println!("{}", s); }
        }
        "request-teacher" => {
            if args.is_empty() { eprintln!("usage: request-teacher <subject>..."); return; }
            let subjects: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            match rt.block_on(client.request_teacher(&subjects)) {
                Ok(()) => println!("application submitted; the ${} subscription is payable in the web checkout", TEACHER_FEE),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }
        "teacher-requests" => match rt.block_on(client.teacher_requests()) {
            Ok(list) => print_list(&list),
            Err(e) => eprintln!("error: {}", e.message()),
        },
        "approve" => {
            if args.is_empty() { eprintln!("usage: approve <user-id> <subject>..."); return; }
            let subjects: Vec<String> = args[1..].iter().map(|s| s.to_string()).collect();
            match rt.block_on(client.approve_teacher(args[0], &subjects)) {
                Ok(()) => println!("approved"),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }
        "teachers" => match rt.block_on(client.approved_teachers()) {
            Ok(list) => print_list(&list),
            Err(e) => eprintln!("error: {}", e.message()),
        },
        "create-room" => {
            if args.len() < 2 { eprintln!("usage: create-room <teacher-id> <subject> [description...]"); return; }
            let description = if args.len() > 2 { Some(args[2..].join(" ")) } else { None };
            match rt.block_on(client.create_teacher_room(args[0], args[1], description.as_deref())) {
                Ok(()) => println!("teacher room created"),
                Err(e) => eprintln!("error: {}", e.message()),
            }
        }
        unk => {
            eprintln!("unknown command: {} (try 'help')", unk);
        }
    }
}

// Enrollment needs the signed-in user, the room's teacher and a
// double-enrollment check before the create call.
fn run_enroll(rt: &tokio::runtime::Runtime, client: &ApiClient, room_id: &str) {
    with_user(rt, client, |rt, client, user_id| {
        let rooms = match rt.block_on(client.teacher_rooms()) {
            Ok(r) => assigned_rooms(r),
            Err(e) => { eprintln!("error: {}", e.message()); return; }
        };
        let Some(room) = rooms.iter().find(|r| r.id == room_id) else {
            eprintln!("no such class: {} (see 'rooms')", room_id);
            return;
        };
        let Some(teacher) = room.teacher.as_ref() else {
            eprintln!("class {} has no teacher assigned", room_id);
            return;
        };
        let enrollments = match rt.block_on(client.student_enrollments(&user_id)) {
            Ok(l) => l,
            Err(e) => { eprintln!("error: {}", e.message()); return; }
        };
        if already_enrolled(&enrollments, &teacher.id) {
            println!("already enrolled with {}", teacher.name);
            return;
        }
        match rt.block_on(client.enroll(&user_id, &teacher.id, &room.id)) {
            Ok(()) => println!(
                "enrolled with {} for {}; the ${} fee is payable in the web checkout",
                teacher.name, room.subject, ENROLLMENT_FEE
            ),
            Err(e) => eprintln!("enrollment failed: {}", e.message()),
        }
    });
}

// Run an operation that needs the signed-in user's id, fetching the
// snapshot first if only a persisted token is present.
fn with_user<F>(rt: &tokio::runtime::Runtime, client: &ApiClient, f: F)
where
    F: FnOnce(&tokio::runtime::Runtime, &ApiClient, String),
{
    let user = match client.session().user {
        Some(u) => Some(u),
        None if client.is_authenticated() => rt.block_on(client.me()).ok(),
        None => None,
    };
    match user {
        Some(u) => f(rt, client, u.id),
        None => eprintln!("sign in first ('login <email> <password>')"),
    }
}

fn print_list<T: serde::Serialize>(items: &[T]) {
    if items.is_empty() {
        println!("(no records)");
        return;
    }
    match serde_json::to_value(items) {
        Ok(val) => {
            if !print_records(&val) {
                println!("{}", serde_json::to_string_pretty(&val).unwrap_or_else(|_| val.to_string()));
            }
        }
        Err(e) => eprintln!("render error: {}", e),
    }
}

fn print_value<T: serde::Serialize>(item: &T) {
    match serde_json::to_value(item) {
        Ok(val) => println!("{}", serde_json::to_string_pretty(&val).unwrap_or_else(|_| val.to_string())),
        Err(e) => eprintln!("render error: {}", e),
    }
}
