//! Opens one archive file directly and dumps its entry table.
//!
//! ```text
//! unpak_ls --archive DUKE3D.GRP
//! unpak_ls --archive pak0.pak --extract maps/e1m1.bsp --output e1m1.bsp
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use unpak::archive::{Archive, Probe, Visit};
use unpak::formats::builtin_formats;
use unpak::stream::{NativeStream, Stream};

#[derive(Parser)]
#[command(name = "unpak_ls")]
struct Cli {
    /// Archive file to open.
    #[clap(long)]
    pub archive: PathBuf,

    /// Entry to extract instead of listing.
    #[clap(long)]
    pub extract: Option<String>,

    /// File to write the extracted entry into.
    #[clap(long)]
    pub output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();

    let mut archive = open(&args.archive)?;

    if let Some(name) = &args.extract {
        let mut stream = archive.open_read(name)?;
        let mut data = Vec::new();
        let mut chunk = [0u8; 64 * 1024];
        loop {
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        match &args.output {
            Some(path) => std::fs::write(path, &data)?,
            None => std::io::Write::write_all(&mut std::io::stdout(), &data)?,
        }
        return Ok(());
    }

    list(&mut *archive, "")?;
    Ok(())
}

fn open(path: &Path) -> Result<Box<dyn Archive>, Box<dyn std::error::Error>> {
    let mut stream: Box<dyn Stream> = Box::new(NativeStream::open_read(path)?);
    for format in builtin_formats() {
        stream.seek(0)?;
        match format.try_open(stream) {
            Probe::Opened(archive) => {
                info!(format = %format.info().extension, "recognized");
                return Ok(archive);
            }
            Probe::NotMine(returned) => stream = returned,
            Probe::Failed(code) => return Err(code.into()),
        }
    }
    Err(unpak::ErrorCode::Unsupported.into())
}

fn list(archive: &mut dyn Archive, dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut children = Vec::new();
    archive.enumerate(dir, &mut |name| {
        children.push(name.to_owned());
        Ok(Visit::Continue)
    })?;
    children.sort();

    for name in children {
        let path = if dir.is_empty() {
            name
        } else {
            format!("{dir}/{name}")
        };
        let stat = archive.stat(&path)?;
        if stat.filetype == unpak::FileType::Directory {
            println!("{path}/");
            list(archive, &path)?;
        } else {
            println!("{path}  ({} bytes)", stat.filesize);
        }
    }
    Ok(())
}
