//! Mounts sources onto a virtual tree, then lists it or extracts one file.
//!
//! ```text
//! lsvfs --source DUKE3D.GRP --source ./mods --cat /DEFS.CON
//! ```

use clap::Parser;
use stackfs::{FileType, Vfs};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "lsvfs")]
struct Cli {
    /// Archives or directories to mount, front of the stack first.
    #[clap(long, required = true)]
    pub source: Vec<String>,

    /// Virtual prefix to mount every source under.
    #[clap(long)]
    pub mount_point: Option<String>,

    /// Follow symbolic links in directory mounts.
    #[clap(long)]
    pub follow_symlinks: bool,

    /// Virtual file to print to stdout instead of listing the tree.
    #[clap(long)]
    pub cat: Option<String>,

    /// File to copy the `--cat` target into.
    #[clap(long)]
    pub output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Cli::parse();

    let vfs = Vfs::new()?;
    vfs.permit_symlinks(args.follow_symlinks);
    for source in &args.source {
        vfs.mount(source, args.mount_point.as_deref(), true)?;
        info!(source, "mounted");
    }

    if let Some(name) = &args.cat {
        let mut handle = vfs.open_read(name)?;
        let mut data = Vec::new();
        handle.read_to_end(&mut data)?;
        match &args.output {
            Some(path) => std::fs::write(path, &data)?,
            None => std::io::Write::write_all(&mut std::io::stdout(), &data)?,
        }
        return Ok(());
    }

    list(&vfs, "/")?;
    Ok(())
}

fn list(vfs: &Vfs, dir: &str) -> stackfs::Result<()> {
    for name in vfs.list_files(dir)? {
        let path = if dir == "/" {
            format!("/{name}")
        } else {
            format!("{dir}/{name}")
        };
        let stat = vfs.stat(&path)?;
        if stat.filetype == FileType::Directory {
            println!("{path}/");
            list(vfs, &path)?;
        } else {
            println!("{path}  ({} bytes)", stat.filesize);
        }
    }
    Ok(())
}
