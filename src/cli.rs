use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::drive::DriveClient;
use crate::drive::constants::DEFAULT_PAGE_SIZE;
use crate::drive::gdrive::GoogleDrive;
use crate::error::Result;
use crate::server;

#[derive(Parser)]
#[command(
    name = "drivify",
    version,
    about = "Manage Google Drive files with retry-aware operations"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload a local file
    Upload {
        path: PathBuf,
        mime_type: String,
        /// Parent folder id (defaults to the configured root folder)
        #[arg(long)]
        parent: Option<String>,
    },
    /// List files, scoped to the configured root folder when set
    List {
        /// Extra Drive query expression, ANDed after the root scope
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },
    /// Download a file to a local path
    Download { file_id: String, dest: PathBuf },
    /// Replace a file's content and/or rename it
    Update {
        file_id: String,
        path: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Permanently delete a file
    Delete { file_id: String },
    /// Print a file's metadata
    Meta { file_id: String },
    /// Create a folder
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Run the HTTP demo server
    Serve {
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
}

pub async fn run(args: Args, client: DriveClient<GoogleDrive>) -> Result<()> {
    match args.command {
        Command::Upload {
            path,
            mime_type,
            parent,
        } => {
            let file = client
                .upload_file(&path, &mime_type, parent.as_deref())
                .await?;
            println!("Uploaded: {} ({})", file.id, file.name);
        }
        Command::List { query, page_size } => {
            let files = client.list_files(query.as_deref(), page_size).await?;
            for file in files {
                println!(
                    "{} {} {}",
                    file.id,
                    file.name,
                    file.mime_type.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Download { file_id, dest } => {
            client.download_file(&file_id, &dest).await?;
            println!("Downloaded to {}", dest.display());
        }
        Command::Update {
            file_id,
            path,
            name,
        } => {
            let file = client
                .update_file(&file_id, path.as_deref(), name.as_deref())
                .await?;
            println!("Updated: {} ({})", file.id, file.name);
        }
        Command::Delete { file_id } => {
            client.delete_file(&file_id).await?;
            println!("Deleted: {file_id}");
        }
        Command::Meta { file_id } => {
            let file = client.get_file_meta(&file_id).await?;
            println!("{file:#?}");
        }
        Command::Mkdir { name, parent } => {
            let folder = client.create_folder(&name, parent.as_deref()).await?;
            println!("Created folder: {} ({})", folder.id, folder.name);
        }
        Command::Serve { port } => {
            server::serve(client, port).await?;
        }
    }

    Ok(())
}
