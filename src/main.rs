use std::collections::BTreeMap;
use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use duke::codec::ClassHeader;
use duke::tree::version::Version;
use dukedown::TransformerManager;

#[derive(Debug, Parser)]
struct Cli {
	/// Be verbose.
	#[arg(short = 'v', long = "verbose")]
	verbose: bool,

	/// Only print warnings and errors.
	#[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
	quiet: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Lists the call sites that get replaced when downgrading to the target
	Rules {
		#[arg(long = "target", value_enum, default_value_t)]
		target: Release,
	},
	/// Shows the class file versions of the classes in a jar
	Inspect {
		archive: PathBuf,
		#[arg(long = "target", value_enum, default_value_t)]
		target: Release,
	},
	/// Parses and compares java runtime version strings
	Version {
		#[command(subcommand)]
		command: VersionCommand,
	},
}

#[derive(Debug, Subcommand)]
enum VersionCommand {
	/// Parses a version string and prints its parts
	Parse {
		version: String,
	},
	/// Compares two version strings
	Compare {
		a: String,
		b: String,
		/// Don't look at the optional information after the build number.
		#[arg(long = "ignore-optional")]
		ignore_optional: bool,
	},
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Release {
	#[default]
	#[value(name = "8")]
	Java8,
	#[value(name = "9")]
	Java9,
	#[value(name = "10")]
	Java10,
	#[value(name = "11")]
	Java11,
	#[value(name = "12")]
	Java12,
}

impl Release {
	fn version(self) -> Version {
		match self {
			Release::Java8 => Version::V1_8,
			Release::Java9 => Version::V9,
			Release::Java10 => Version::V10,
			Release::Java11 => Version::V11,
			Release::Java12 => Version::V12,
		}
	}
}

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
	let level = if quiet {
		LevelFilter::Warn
	} else if verbose {
		LevelFilter::Debug
	} else {
		LevelFilter::Info
	};

	fern::Dispatch::new()
		.format(|out, message, record| {
			out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
		})
		.level(level)
		.chain(std::io::stderr())
		.apply()
		.context("failed to set up logging")
}

fn main() -> Result<()> {
	let Cli { verbose, quiet, command } = Cli::parse();
	setup_logging(verbose, quiet)?;
	debug!("running {command:?}");

	match command {
		Command::Rules { target } => rules(target.version()),
		Command::Inspect { archive, target } => inspect(archive, target.version()),
		Command::Version { command: VersionCommand::Parse { version } } => {
			let version = runtime_version::Version::parse(&version)?;
			println!("version:    {version}");
			println!("components: {:?}", version.components());
			println!("feature:    {}", version.feature());
			println!("interim:    {}", version.interim());
			println!("update:     {}", version.update());
			println!("patch:      {}", version.patch());
			println!("pre:        {}", version.pre().unwrap_or("-"));
			println!("build:      {}", version.build().map_or_else(|| "-".to_owned(), |build| build.to_string()));
			println!("optional:   {}", version.optional().unwrap_or("-"));
			Ok(())
		},
		Command::Version { command: VersionCommand::Compare { a, b, ignore_optional } } => {
			let first = runtime_version::Version::parse(&a)?;
			let second = runtime_version::Version::parse(&b)?;
			let ordering = if ignore_optional {
				first.cmp_ignore_optional(&second)
			} else {
				first.cmp(&second)
			};
			let sign = match ordering {
				std::cmp::Ordering::Less => "<",
				std::cmp::Ordering::Equal => "==",
				std::cmp::Ordering::Greater => ">",
			};
			println!("{first} {sign} {second}");
			Ok(())
		},
	}
}

fn rules(target: Version) -> Result<()> {
	let manager = TransformerManager::new()?;
	for step in manager.steps_to(target) {
		println!("{} -> {}: {} rules, {} hooks", step.source(), step.target(), step.registry().len(), step.hook_count());
		for rule in step.registry().rules() {
			println!("\t{rule}");
		}
	}
	Ok(())
}

fn inspect(archive: PathBuf, target: Version) -> Result<()> {
	let manager = TransformerManager::new()?;

	let (histogram, broken) = dukebox::with_archive(&archive, |dir| {
		let names: Vec<String> = dir.names()
			.filter(|name| name.ends_with(".class"))
			.map(str::to_owned)
			.collect();

		let mut histogram: BTreeMap<Version, usize> = BTreeMap::new();
		let mut broken = Vec::new();
		for name in names {
			let bytes = dir.read(&name)?
				.with_context(|| anyhow!("entry {name:?} is listed, but can't be found"))?;
			match ClassHeader::read(&bytes) {
				Ok(header) => *histogram.entry(header.version).or_default() += 1,
				Err(e) => broken.push((name, e)),
			}
		}
		Ok((histogram, broken))
	})?;

	for (version, count) in &histogram {
		println!("{version}: {count} classes");
	}
	for (name, e) in &broken {
		println!("{name}: not a class file: {e:#}");
	}

	let to_downgrade: usize = histogram.range(..=manager.highest_source())
		.filter(|(version, _)| **version > target)
		.map(|(_, count)| count)
		.sum();
	let too_new: usize = histogram.iter()
		.filter(|(version, _)| **version > manager.highest_source())
		.map(|(_, count)| count)
		.sum();
	println!("{to_downgrade} classes need to be downgraded to {target}");
	if too_new > 0 {
		println!("{too_new} classes are newer than {}, and can't be downgraded", manager.highest_source());
	}
	Ok(())
}
