#![forbid(unsafe_code)]

//! sellado CLI: CMS, CAdES, XAdES and XML-DSig signing, counter-signing
//! and CMS verification.

use clap::{Args, Parser, Subcommand};
use sellado_cms::{SignedContainer, VerifyResult};
use sellado_core::{CounterSignTarget, DigestAlgorithm, Error, SignMode, SignatureFormat};
use sellado_formats::{FormatRegistry, SignRequest};
use sellado_keys::SigningIdentity;
use sellado_massive::{output_file_name, MassiveSignConfiguration, MassiveSigner};
use sellado_xades::{XadesVersion, XmlSignatureParameters};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "sellado",
    about = "sellado: electronic signatures (CMS, CAdES, XAdES, XML-DSig)",
    version
)]
struct Cli {
    /// Verbose output (debug logging; RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign one or more files
    Sign(SignArgs),

    /// Add counter-signatures to an existing signature
    Countersign(CounterSignArgs),

    /// Verify every signer of a CMS/CAdES signature
    Verify {
        /// Signature file (DER)
        signature: PathBuf,

        /// Detached content the signature covers
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// List signature formats and their capabilities
    Formats,
}

#[derive(Args)]
struct IdentityArgs {
    /// Private key (PEM or DER; PKCS#8, encrypted PKCS#8 or PKCS#1)
    #[arg(short = 'k', long)]
    key: PathBuf,

    /// Certificate chain, signer certificate first (PEM or DER)
    #[arg(short = 'c', long)]
    cert: PathBuf,

    /// Password of an encrypted private key
    #[arg(long)]
    password: Option<String>,
}

impl IdentityArgs {
    fn load(&self) -> Result<SigningIdentity, Error> {
        sellado_keys::loader::load_identity(&self.key, &self.cert, self.password.as_deref())
    }
}

#[derive(Args)]
struct SignArgs {
    /// Files to sign
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    identity: IdentityArgs,

    /// Signature format (CMS, CAdES, "XAdES Detached", xades-enveloped, ...)
    #[arg(short, long, default_value = "CMS")]
    format: String,

    /// explicit or implicit
    #[arg(short, long, default_value = "implicit")]
    mode: String,

    /// Signature digest algorithm
    #[arg(short, long, default_value = "SHA-256")]
    digest: String,

    /// Inputs are precomputed binary digests of the content
    #[arg(long)]
    hash: bool,

    /// Algorithm of the precomputed digests (default: inferred from length)
    #[arg(long = "hash-algorithm")]
    hash_algorithm: Option<String>,

    /// XAdES namespace version
    #[arg(long = "xades-version", default_value = "1.3.2")]
    xades_version: String,

    /// Digest of XML references (default SHA-512)
    #[arg(long = "reference-digest")]
    reference_digest: Option<String>,

    /// URI of the content in explicit XML signatures
    #[arg(long = "reference-uri")]
    reference_uri: Option<String>,

    /// MIME type of the signed content in XML signatures
    #[arg(long = "mime-type")]
    mime_type: Option<String>,

    /// Reference XML content through a ds:Manifest
    #[arg(long)]
    manifest: bool,

    /// Output file (single input only; default: stdout, or <input>.<ext>
    /// for several inputs)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CounterSignArgs {
    /// Existing signature
    signature: PathBuf,

    #[command(flatten)]
    identity: IdentityArgs,

    /// Format of the existing signature
    #[arg(short, long, default_value = "CMS")]
    format: String,

    /// tree, leafs, nodes or signers
    #[arg(short, long, default_value = "tree")]
    target: String,

    /// Pre-order signer indices for the nodes/signers targets
    #[arg(short, long)]
    index: Vec<usize>,

    /// Select CMS signers by certificate common name (signers target)
    #[arg(long = "signer-name")]
    signer_name: Vec<String>,

    /// Signature digest algorithm
    #[arg(short, long, default_value = "SHA-256")]
    digest: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Sign(args) => cmd_sign(args, cli.verbose),
        Commands::Countersign(args) => cmd_countersign(args, cli.verbose),
        Commands::Verify { signature, content } => cmd_verify(signature, content, cli.verbose),
        Commands::Formats => cmd_formats(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn cmd_sign(args: SignArgs, verbose: bool) -> Result<(), Error> {
    if args.output.is_some() && args.inputs.len() > 1 {
        return Err(Error::Configuration("--output needs a single input".into()));
    }
    let format: SignatureFormat = args.format.parse()?;
    let mode: SignMode = args.mode.parse()?;

    let mut xml = XmlSignatureParameters::new()
        .with_xades_version(args.xades_version.parse::<XadesVersion>()?)
        .with_manifest(args.manifest);
    if let Some(digest) = &args.reference_digest {
        xml = xml.with_reference_digest(DigestAlgorithm::from_name(digest)?);
    }
    if let Some(uri) = args.reference_uri {
        xml = xml.with_external_reference_uri(uri);
    }
    if let Some(mime_type) = args.mime_type {
        xml = xml.with_mime_type(mime_type);
    }

    let mut config = MassiveSignConfiguration::new(args.identity.load()?);
    config.set_format(format);
    config.set_mode(mode);
    config.set_digest_algorithm(DigestAlgorithm::from_name(&args.digest)?);
    if let Some(name) = &args.hash_algorithm {
        config.set_hash_algorithm(Some(DigestAlgorithm::from_name(name)?));
    }
    config.set_xml_parameters(xml);

    let registry = FormatRegistry::new();
    let massive = MassiveSigner::new(&config, &registry);
    let batch = args.inputs.len() > 1;
    for input in &args.inputs {
        if verbose {
            eprintln!("Signing: {} ({format}, {mode})", input.display());
        }
        let signature = if args.hash {
            massive.sign_hash(&read_file(input)?)?
        } else {
            massive.sign_file(input)?
        };
        let output = match &args.output {
            Some(path) => Some(path.clone()),
            None if batch => Some(output_file_name(input, format)),
            None => None,
        };
        write_output(output, &signature)?;
    }
    Ok(())
}

fn cmd_countersign(args: CounterSignArgs, verbose: bool) -> Result<(), Error> {
    let format: SignatureFormat = args.format.parse()?;
    let sign = read_file(&args.signature)?;
    let identity = args.identity.load()?;

    let target = match args.target.to_ascii_lowercase().as_str() {
        "tree" => CounterSignTarget::Tree,
        "leafs" | "leaves" => CounterSignTarget::Leafs,
        "nodes" => CounterSignTarget::Nodes(args.index.clone()),
        "signers" if !args.signer_name.is_empty() => {
            if !format.is_cms() {
                return Err(Error::Configuration(
                    "--signer-name is only supported for CMS and CAdES".into(),
                ));
            }
            let container = SignedContainer::decode(&sign)?;
            let names: Vec<&str> = args.signer_name.iter().map(String::as_str).collect();
            CounterSignTarget::Signers(sellado_cms::resolve_signers(&container, &names)?)
        }
        "signers" => CounterSignTarget::Signers(args.index.clone()),
        other => {
            return Err(Error::Configuration(format!("unknown counter-signature target: {other}")));
        }
    };
    if let CounterSignTarget::Nodes(indices) | CounterSignTarget::Signers(indices) = &target {
        if indices.is_empty() {
            return Err(Error::Configuration(
                "the nodes and signers targets need --index or --signer-name".into(),
            ));
        }
    }

    if verbose {
        eprintln!("Counter-signing: {} ({format}, {target:?})", args.signature.display());
    }
    let request =
        SignRequest::new(&identity).with_digest_algorithm(DigestAlgorithm::from_name(&args.digest)?);
    let out = FormatRegistry::new().counter_sign(format, &sign, &target, &request)?;
    write_output(args.output, &out)
}

fn cmd_verify(signature: PathBuf, content: Option<PathBuf>, verbose: bool) -> Result<(), Error> {
    let container = SignedContainer::decode(&read_file(&signature)?)?;
    let content = content.as_deref().map(read_file).transpose()?;

    if verbose {
        eprintln!("Verifying: {}", signature.display());
    }

    match sellado_cms::verify(&container, content.as_deref())? {
        VerifyResult::Valid(signers) => {
            println!("OK");
            if verbose {
                for signer in signers {
                    eprintln!(
                        "  signer {} (depth {}): {}",
                        signer.index,
                        signer.path.len().saturating_sub(1),
                        signer.subject.as_deref().unwrap_or("unknown subject")
                    );
                }
            }
            Ok(())
        }
        VerifyResult::Invalid { index, reason } => {
            eprintln!("INVALID: signer {index}: {reason}");
            process::exit(1);
        }
    }
}

fn cmd_formats() -> Result<(), Error> {
    println!("{:<20} {:<20} {:<6} {:<8} {}", "FORMAT", "MODES", "HASH", "COUNTER", "INPUTS");
    for format in SignatureFormat::ALL {
        let caps = format.capabilities();
        let modes: Vec<&str> = caps.supported_modes.iter().map(SignMode::name).collect();
        let inputs: Vec<&str> = caps.input_kinds.iter().map(|k| k.extension()).collect();
        println!(
            "{:<20} {:<20} {:<6} {:<8} {}",
            format.name(),
            modes.join(","),
            if caps.supports_hash_input { "yes" } else { "no" },
            if caps.supports_counter_signature { "yes" } else { "no" },
            inputs.join(",")
        );
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => {
            std::fs::write(&p, data)?;
            Ok(())
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data)?;
            Ok(())
        }
    }
}
