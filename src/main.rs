//! The quay window manager binary.
//!
//! Exit codes: 0 on a normal shutdown (including being replaced), 1 when the
//! display cannot be opened or the manager selection cannot be acquired, 2
//! on a fatal configuration error at startup.
use quay::{
    managers::{acquire_manager_selection, HintWindow, REPLACE_TIMEOUT},
    x::XConn,
    x11rb::X11rbConn,
    Config, Error, WindowManager,
};
use std::os::unix::process::CommandExt;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let replace = std::env::args().any(|a| a == "--replace");

    let conn = match X11rbConn::new() {
        Ok(conn) => conn,
        Err(e) => {
            error!(%e, "unable to open display");
            return 1;
        }
    };
    let root = conn.root();

    let hints = match HintWindow::create(&conn, root) {
        Ok(h) => h,
        Err(e) => {
            error!(%e, "unable to create the hint window");
            return 1;
        }
    };

    if let Err(e) =
        acquire_manager_selection(&conn, root, hints.window, 0, replace, REPLACE_TIMEOUT)
    {
        error!(%e, "unable to acquire the manager selection");
        return 1;
    }

    // configuration is parsed externally; the defaults below are what an
    // empty config dir resolves to
    let config = Config::default();

    let wm = match WindowManager::new(config, conn) {
        Ok(wm) => wm,
        Err(e @ Error::MissingDefaultDecor) => {
            error!(%e, "fatal configuration error");
            return 2;
        }
        Err(e) => {
            error!(%e, "unable to initialise");
            return 1;
        }
    };

    let restart = match wm.run() {
        Ok(restart) => restart,
        Err(e) => {
            error!(%e, "window manager exited with an error");
            return 1;
        }
    };

    if restart {
        if let Ok(exe) = std::env::current_exe() {
            info!(?exe, "restarting");
            let err = std::process::Command::new(exe).exec();
            error!(%err, "unable to re-exec");
            return 1;
        }
    }

    0
}
