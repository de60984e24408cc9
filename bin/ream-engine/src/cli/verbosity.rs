use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl Verbosity {
    pub fn directive(&self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

pub fn verbosity_parser(verbosity_string: &str) -> Result<Verbosity, String> {
    match verbosity_string.parse::<u8>() {
        Ok(0 | 1) => Ok(Verbosity::Error),
        Ok(2) => Ok(Verbosity::Warn),
        Ok(3) => Ok(Verbosity::Info),
        Ok(4) => Ok(Verbosity::Debug),
        Ok(_) => Ok(Verbosity::Trace),
        Err(err) => Err(format!("Could not parse the verbosity level: {err:?}")),
    }
}
