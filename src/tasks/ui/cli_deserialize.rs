/* ************************************************************************ **
** This file is part of msim, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of msim is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

use crate::FailResult;
use crate::env;
use crate::ui::logging::GlobalLogger;

use clap::{Arg, ArgMatches, App};
use msim_tasks_config::{Settings, YamlRead};
use path_abs::{PathDir, PathFile};

/// Adds a group of arguments to a clap app, and reads them back out.
///
/// Groups compose as tuples, so an entry point can ask for `(LoggingArgs, (ConfigArgs, DirArg))`.
pub trait CliDeserialize: Sized {
    fn augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> (App<'a, 'b>, ClapDeserializer<Self>)
    {
        let app = Self::_augment_clap_app(app);
        let token = ClapDeserializer(Default::default());
        (app, token)
    }

    /// Don't use this. Call 'augment_clap_app' instead.
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b>;
    /// Don't use this. Call 'resolve_args' on the ClapDeserializer instead.
    fn _resolve_args(matches: &ArgMatches<'_>) -> FailResult<Self>;
}

/// Token of "proof" that a clap app was augmented to be capable of deserializing A.
pub struct ClapDeserializer<A>(std::marker::PhantomData<A>);

impl<A> ClapDeserializer<A>
where A: CliDeserialize,
{
    /// Deserialize the arguments.  This may perform IO such as reading the config file.
    pub fn resolve_args(self, matches: &ArgMatches<'_>) -> FailResult<A>
    { A::_resolve_args(matches) }
}

impl CliDeserialize for () {
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b>
    { app }

    fn _resolve_args(_: &ArgMatches<'_>) -> FailResult<Self>
    { Ok(()) }
}

impl<A, B> CliDeserialize for (A, B)
where
    A: CliDeserialize,
    B: CliDeserialize,
{
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b>
    {
        let app = A::_augment_clap_app(app);
        B::_augment_clap_app(app)
    }

    fn _resolve_args(matches: &ArgMatches<'_>) -> FailResult<Self>
    { Ok((A::_resolve_args(matches)?, B::_resolve_args(matches)?)) }
}

//--------------------------------------------------------

/// `-v` and `--log`. Resolving these installs the global logger.
#[derive(Debug, Clone)]
pub struct LoggingArgs;

impl CliDeserialize for LoggingArgs {
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.args(&[
            Arg::with_name("verbose")
                .short("v").long("verbose")
                .multiple(true)
                .help("log more (may be repeated)"),
            Arg::with_name("log")
                .long("log").value_name("FILE")
                .takes_value(true)
                .help("also append log output to this file"),
        ])
    }

    fn _resolve_args(m: &ArgMatches<'_>) -> FailResult<Self> {
        let mut logger = GlobalLogger::default();
        logger.verbosity(m.occurrences_of("verbose"));
        logger.show_target(env::log_mod()?);
        if let Some(path) = m.value_of("log") {
            logger.path(PathDir::current_dir()?.join(path));
        }
        logger.apply()?;
        Ok(LoggingArgs)
    }
}

/// `--config FILE`, read but not yet validated.
///
/// Entry points apply their own flags on top, then call `validate`.
#[derive(Debug, Clone)]
pub struct ConfigArgs(pub Settings);

impl CliDeserialize for ConfigArgs {
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.args(&[
            Arg::with_name("config")
                .short("c").long("config").value_name("CONFIG")
                .takes_value(true)
                .help("settings yaml; built-in defaults are used for anything not given"),
        ])
    }

    fn _resolve_args(m: &ArgMatches<'_>) -> FailResult<Self> {
        let settings = match m.value_of("config") {
            Some(path) => {
                let file = PathFile::new(path)?;
                info!("Reading settings from '{}'.", file.display());
                Settings::from_reader(file.read()?)?
            },
            None => Settings::default(),
        };
        Ok(ConfigArgs(settings))
    }
}

/// `-C DIR`: the directory to work in, defaulting to the current one.
#[derive(Debug, Clone)]
pub struct DirArg(pub PathDir);

impl CliDeserialize for DirArg {
    fn _augment_clap_app<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.args(&[
            Arg::with_name("dir")
                .short("C").long("dir").value_name("DIR")
                .takes_value(true)
                .help("working directory [default: the current directory]"),
        ])
    }

    fn _resolve_args(m: &ArgMatches<'_>) -> FailResult<Self> {
        Ok(DirArg(match m.value_of("dir") {
            Some(dir) => PathDir::new(PathDir::current_dir()?.join(dir))?,
            None => PathDir::current_dir()?,
        }))
    }
}
