//! REPL command implementation

use std::path::Path;

/// Run the Scheme REPL or execute a script
///
/// Scripts open devices themselves with `(spi-open bus device)`.
pub fn cmd_repl(script: Option<&Path>, dummy: bool) -> Result<(), Box<dyn std::error::Error>> {
    if dummy {
        run_dummy(script)
    } else {
        run(rspidev_linux::LinuxConnector, script)
    }
}

fn run<C>(connector: C, script: Option<&Path>) -> Result<(), Box<dyn std::error::Error>>
where
    C: rspidev_core::Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    match script {
        Some(path) => rspidev_repl::run_script_file(connector, path)?,
        None => rspidev_repl::run_repl(connector)?,
    }
    Ok(())
}

#[cfg(feature = "dummy")]
fn run_dummy(script: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    run(rspidev_dummy::DummyConnector::default(), script)
}

#[cfg(not(feature = "dummy"))]
fn run_dummy(_script: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    Err("rspidev was built without the dummy feature".into())
}
