//! Manage tagged P-256 keys and sign or verify messages from the command line.
//!
//! Keys are kept in a directory of sealed records (see `keysafe_cryptography::store::directory`).
//! Every invocation must supply the same `--storage-dir` and `--sealing-key`.
//!
//! # Usage
//!
//! ```sh
//! export KEYS="--storage-dir /tmp/keysafe --sealing-key $(openssl rand -hex 32)"
//!
//! # Generate a pair (prints the compressed public key)
//! keysafe $KEYS generate --private-tag priv1 --public-tag pub1
//!
//! # Sign (prints the r || s signature as hex)
//! keysafe $KEYS sign --tag priv1 --message hello
//!
//! # Verify (exits 0 if valid, 1 if not)
//! keysafe $KEYS verify --tag pub1 --message hello --signature <signature>
//!
//! # Bitcoin (or, with --ripple, Ripple) address of a stored key
//! keysafe $KEYS address --tag pub1
//! ```
//!
//! Results are written to stdout. Logs are written to stderr. Any failure exits with status 2.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use keysafe_cryptography::{
    address,
    store::directory::{Config, Directory},
    utils::from_hex_formatted,
    AddressKind, EncodedPublicKey, KeyStore, PointFormat, Secret, SignatureEngine,
};
use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, error, Level};
use zeroize::Zeroizing;

const EXIT_SUCCESS: u8 = 0;

/// Exit status when a signature does not verify.
const EXIT_INVALID: u8 = 1;

/// Exit status when a command fails.
const EXIT_FAILURE: u8 = 2;

#[derive(Debug, Error)]
enum Error {
    #[error("invalid {0}: {1}")]
    InvalidArgument(&'static str, &'static str),
    #[error(transparent)]
    Key(#[from] keysafe_cryptography::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

type Engine = SignatureEngine<Directory>;

/// Message input shared by `sign` and `verify`.
enum Input<'a> {
    Message(&'a [u8]),
    Digest(&'a str),
}

fn tag_arg(name: &'static str) -> Arg {
    Arg::new(name).long(name).required(true)
}

fn uncompressed_arg() -> Arg {
    Arg::new("uncompressed")
        .long("uncompressed")
        .action(ArgAction::SetTrue)
}

fn point_format(matches: &ArgMatches) -> PointFormat {
    if matches.get_flag("uncompressed") {
        PointFormat::Uncompressed
    } else {
        PointFormat::Compressed
    }
}

fn input_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("message")
                .long("message")
                .conflicts_with("digest")
                .required_unless_present("digest")
                .help("Message to hash and sign (UTF-8)"),
        )
        .arg(
            Arg::new("digest")
                .long("digest")
                .help("Hex encoded SHA-256 digest computed by the caller"),
        )
}

fn command() -> Command {
    Command::new("keysafe")
        .about("manage tagged P-256 keys and sign or verify messages")
        .subcommand_required(true)
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("sealing-key")
                .long("sealing-key")
                .required(true)
                .help("Hex encoded 32-byte key that seals stored records"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("info")
                .value_parser(value_parser!(Level)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("generate a key pair and store both halves")
                .arg(tag_arg("private-tag"))
                .arg(tag_arg("public-tag")),
        )
        .subcommand(
            Command::new("import")
                .about("store an existing private key under a single tag")
                .arg(tag_arg("tag"))
                .arg(
                    Arg::new("private-key")
                        .long("private-key")
                        .required(true)
                        .help("Hex encoded 32-byte private scalar"),
                ),
        )
        .subcommand(input_args(
            Command::new("sign")
                .about("sign a message with a stored private key")
                .arg(tag_arg("tag")),
        ))
        .subcommand(input_args(
            Command::new("verify")
                .about("verify a signature (exit status 0 if valid, 1 if not)")
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .conflicts_with("public-key")
                        .required_unless_present("public-key")
                        .help("Tag of a stored key to verify against"),
                )
                .arg(
                    Arg::new("public-key")
                        .long("public-key")
                        .help("Hex encoded SEC 1 public key to verify against"),
                )
                .arg(
                    Arg::new("signature")
                        .long("signature")
                        .required(true)
                        .help("Hex encoded r || s signature"),
                ),
        ))
        .subcommand(
            Command::new("public-key")
                .about("print the public key stored under a tag")
                .arg(tag_arg("tag"))
                .arg(uncompressed_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("delete the key stored under a tag")
                .arg(tag_arg("tag")),
        )
        .subcommand(Command::new("list").about("list stored tags"))
        .subcommand(
            Command::new("address")
                .about("print the Bitcoin address of the key stored under a tag")
                .arg(tag_arg("tag"))
                .arg(
                    Arg::new("ripple")
                        .long("ripple")
                        .action(ArgAction::SetTrue)
                        .help("Use the Ripple alphabet"),
                )
                .arg(uncompressed_arg().help("Hash the uncompressed point")),
        )
}

fn main() -> ExitCode {
    let matches = command().get_matches();

    // Create logger
    let level = matches
        .get_one::<Level>("log-level")
        .copied()
        .unwrap_or(Level::INFO);
    let logger = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);
    if matches.get_flag("json") {
        logger.json().init();
    } else {
        logger.init();
    }

    ExitCode::from(execute(&matches, &mut io::stdout().lock()))
}

/// Run the parsed command, returning its exit status.
fn execute(matches: &ArgMatches, out: &mut impl Write) -> u8 {
    match run(matches, out) {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "command failed");
            EXIT_FAILURE
        }
    }
}

fn sealing_key(matches: &ArgMatches) -> Result<Secret<[u8; 32]>, Error> {
    let raw = matches
        .get_one::<String>("sealing-key")
        .ok_or(Error::InvalidArgument("sealing-key", "missing"))?;
    let decoded = Zeroizing::new(
        from_hex_formatted(raw).ok_or(Error::InvalidArgument("sealing-key", "invalid hex"))?,
    );
    let mut key = Zeroizing::new([0u8; 32]);
    if decoded.len() != key.len() {
        return Err(Error::InvalidArgument("sealing-key", "expected 32 bytes"));
    }
    key.copy_from_slice(&decoded);
    Ok(Secret::new(*key))
}

fn open(matches: &ArgMatches) -> Result<Engine, Error> {
    let path = matches
        .get_one::<PathBuf>("storage-dir")
        .cloned()
        .ok_or(Error::InvalidArgument("storage-dir", "missing"))?;
    let directory = Directory::init(Config {
        path,
        sealing_key: sealing_key(matches)?,
    })?;
    Ok(SignatureEngine::new(Arc::new(KeyStore::new(directory))))
}

fn required<'a>(matches: &'a ArgMatches, name: &'static str) -> Result<&'a str, Error> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or(Error::InvalidArgument(name, "missing"))
}

fn input(matches: &ArgMatches) -> Result<Input<'_>, Error> {
    if let Some(message) = matches.get_one::<String>("message") {
        return Ok(Input::Message(message.as_bytes()));
    }
    Ok(Input::Digest(required(matches, "digest")?))
}

fn run(matches: &ArgMatches, out: &mut impl Write) -> Result<u8, Error> {
    let engine = open(matches)?;
    let store = engine.store();
    match matches.subcommand() {
        Some(("generate", sub)) => {
            let (private_tag, public_tag) = store.generate_and_store(
                required(sub, "private-tag")?,
                required(sub, "public-tag")?,
            )?;
            let public = store.public_key(public_tag.as_str())?;
            debug!(%private_tag, %public_tag, "generated key pair");
            writeln!(out, "{}", public.to_hex(PointFormat::Compressed))?;
        }
        Some(("import", sub)) => {
            let private_key = Zeroizing::new(
                from_hex_formatted(required(sub, "private-key")?)
                    .ok_or(Error::InvalidArgument("private-key", "invalid hex"))?,
            );
            let public = store.import(required(sub, "tag")?, &private_key)?;
            writeln!(out, "{}", public.to_hex(PointFormat::Compressed))?;
        }
        Some(("sign", sub)) => {
            let tag = required(sub, "tag")?;
            let signature = match input(sub)? {
                Input::Message(message) => engine.sign(tag, message)?,
                Input::Digest(digest) => engine.sign_digest(tag, digest)?,
            };
            writeln!(out, "{}", signature.to_hex())?;
        }
        Some(("verify", sub)) => {
            let public: EncodedPublicKey = match sub.get_one::<String>("tag") {
                Some(tag) => store.public_key(tag)?,
                None => engine.decode_public_key(required(sub, "public-key")?)?,
            };
            let signature = required(sub, "signature")?;
            let valid = match input(sub)? {
                Input::Message(message) => engine.verify(&public, message, signature)?,
                Input::Digest(digest) => engine.verify_digest(&public, digest, signature)?,
            };
            writeln!(out, "{}", if valid { "valid" } else { "invalid" })?;
            if !valid {
                return Ok(EXIT_INVALID);
            }
        }
        Some(("public-key", sub)) => {
            let public = store.public_key(required(sub, "tag")?)?;
            writeln!(out, "{}", public.to_hex(point_format(sub)))?;
        }
        Some(("delete", sub)) => {
            let removed = store.delete(required(sub, "tag")?)?;
            writeln!(out, "{}", if removed { "deleted" } else { "absent" })?;
        }
        Some(("list", _)) => {
            for tag in store.tags()? {
                writeln!(out, "{}", tag)?;
            }
        }
        Some(("address", sub)) => {
            let kind = if sub.get_flag("ripple") {
                AddressKind::Ripple
            } else {
                AddressKind::Bitcoin
            };
            let public = store.public_key(required(sub, "tag")?)?;
            writeln!(out, "{}", address::derive(kind, &public, point_format(sub)))?;
        }
        _ => return Err(Error::InvalidArgument("command", "unknown")),
    }
    Ok(EXIT_SUCCESS)
}
