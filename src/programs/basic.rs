//! Basic demo programs
//!
//! Small programs covering each lifecycle path: normal completion, failure
//! after readiness, output before readiness, delayed readiness, and so on.

use anyhow::{anyhow, Context};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::time::Duration;

use crate::helper::ControllerHelper;
use crate::registry::TestProgram;

/// Signals readiness, then returns normally
pub struct Good;

impl TestProgram for Good {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        _args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.server_ready();
            Ok(())
        }
        .boxed_local()
    }
}

/// Signals readiness, then fails with "boom"
pub struct Bad;

impl TestProgram for Bad {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        _args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.server_ready();
            tokio::task::yield_now().await;
            Err(anyhow!("boom"))
        }
        .boxed_local()
    }
}

/// Writes a line before signalling readiness
pub struct Hello;

impl TestProgram for Hello {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        _args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.write_line("hello");
            helper.server_ready();
            Ok(())
        }
        .boxed_local()
    }
}

/// Echoes its arguments after readiness, one per line
pub struct Echo;

impl TestProgram for Echo {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.server_ready();
            for arg in args {
                tokio::task::yield_now().await;
                helper.write_line(arg);
            }
            Ok(())
        }
        .boxed_local()
    }
}

/// Signals readiness twice
pub struct Twice;

impl TestProgram for Twice {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        _args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.server_ready();
            tokio::task::yield_now().await;
            helper.server_ready();
            helper.write("done");
            Ok(())
        }
        .boxed_local()
    }
}

/// Sleeps `args[0]` milliseconds before readiness, then as long again
pub struct Sleepy;

impl TestProgram for Sleepy {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            let millis: u64 = match args.first() {
                Some(arg) => arg
                    .parse()
                    .with_context(|| format!("invalid delay: {arg}"))?,
                None => 10,
            };
            tokio::time::sleep(Duration::from_millis(millis)).await;
            helper.server_ready();
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<_, anyhow::Error>(())
        }
        .boxed_local()
    }
}

/// Never signals readiness and never returns
pub struct Stall;

impl TestProgram for Stall {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        _args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.write_line("stalling");
            futures::future::pending::<()>().await;
            Ok(())
        }
        .boxed_local()
    }
}

/// Panics after readiness
pub struct Panicky;

impl TestProgram for Panicky {
    fn run(
        self: Box<Self>,
        helper: ControllerHelper,
        _args: Vec<String>,
    ) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        async move {
            helper.server_ready();
            tokio::task::yield_now().await;
            if helper.is_ready() {
                panic!("assertion went sideways");
            }
            Ok(())
        }
        .boxed_local()
    }
}
