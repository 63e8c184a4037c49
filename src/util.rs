// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.


use log::LevelFilter;
use std::path::PathBuf;

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub(crate) fn parse_log_level(args: &[String]) -> LevelFilter {
    flag_value(args, "--log-level")
        .map(|level_str| match level_str.to_uppercase().as_str() {
            "OFF" => LevelFilter::Off,
            "TRACE" => LevelFilter::Trace,
            "DEBUG" => LevelFilter::Debug,
            "INFO" => LevelFilter::Info,
            "WARN" => LevelFilter::Warn,
            "ERROR" => LevelFilter::Error,
            _ => {
                eprintln!("Unknown log level: {}. Using INFO", level_str);
                LevelFilter::Info
            }
        })
        .unwrap_or(LevelFilter::Info)
}

pub(crate) fn config_path(args: &[String]) -> Option<PathBuf> {
    flag_value(args, "--config").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn log_level_flag() {
        assert_eq!(parse_log_level(&args("kitchen-scale")), LevelFilter::Info);
        assert_eq!(parse_log_level(&args("kitchen-scale --log-level debug")), LevelFilter::Debug);
        assert_eq!(parse_log_level(&args("kitchen-scale --log-level loud")), LevelFilter::Info);
        assert_eq!(parse_log_level(&args("kitchen-scale --log-level")), LevelFilter::Info);
    }

    #[test]
    fn config_flag() {
        assert_eq!(config_path(&args("kitchen-scale")), None);
        assert_eq!(
            config_path(&args("kitchen-scale --log-level warn --config /etc/scale.json")),
            Some(PathBuf::from("/etc/scale.json"))
        );
    }
}
