use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use puppetry_session::{
    drive, update_interval_from_secs, PoseFile, Scheduler, Session, SessionConfig,
};
use tracing::{info, warn};

use crate::cmd::{parse_duration, StreamArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;

    let pose = PoseFile::new(&args.pose, args.target.clone());
    match pose.armatures() {
        Ok(armatures) => info!(path = %args.pose.display(), ?armatures, "pose file loaded"),
        Err(err) => warn!(path = %args.pose.display(), error = %err, "pose file not readable yet"),
    }

    let mut session = Session::new(config).with_pose_source(pose);
    session.on_message(move |message| print_message(message, format));
    session
        .connect()
        .map_err(|err| session_error("connect failed", err))?;

    let stop = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(stop.clone())?;

    let session = Rc::new(RefCell::new(session));
    let mut scheduler = Scheduler::new();
    drive(Rc::clone(&session), &mut scheduler);
    scheduler.run(&stop);

    let mut session = session.borrow_mut();
    session.disconnect();
    let stats = session.stats();
    info!(
        frames_sent = stats.frames_sent,
        frames_received = stats.frames_received,
        messages_dropped = stats.messages_dropped,
        "stream finished"
    );
    Ok(SUCCESS)
}

fn session_config(args: &StreamArgs) -> CliResult<SessionConfig> {
    let update_interval = update_interval_from_secs(args.update_time)
        .map_err(|err| CliError::new(USAGE, format!("--update-time: {err}")))?;

    let mut config = SessionConfig {
        host: args.host.clone(),
        port: args.port,
        update_interval,
        ..SessionConfig::default()
    };
    config.connect.connect_timeout = parse_duration(&args.connect_timeout)?;
    config
        .validate()
        .map_err(|err| CliError::new(USAGE, format!("invalid settings: {err}")))?;
    Ok(config)
}

fn install_ctrlc_handler(stop: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
