// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SFTP file transfer operations.

use russh_sftp::{client::SftpSession, protocol::OpenFlags};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::connection::Client;

impl Client {
    async fn open_sftp(&self) -> Result<SftpSession, super::Error> {
        let channel = self.get_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }

    /// Upload a file with sftp to the remote device.
    ///
    /// The local file is read completely before any remote file is opened, so
    /// an unreadable source never truncates the destination. The remote file
    /// is created or truncated, written, flushed and closed; any failure on
    /// the remote side is returned rather than leaving a silently short file.
    pub async fn upload_file<T: AsRef<Path>, U: Into<String>>(
        &self,
        src_file_path: T,
        //fa993: This cannot be AsRef<Path> because of underlying lib constraints as described here
        //https://github.com/AspectUnk/russh-sftp/issues/7#issuecomment-1738355245
        dest_file_path: U,
    ) -> Result<(), super::Error> {
        let file_contents = tokio::fs::read(src_file_path.as_ref()).await?;

        let sftp = self.open_sftp().await?;
        let mut file = sftp
            .open_with_flags(
                dest_file_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await?;
        file.write_all(&file_contents).await?;
        file.flush().await?;
        file.shutdown().await?;

        if let Err(e) = sftp.close().await {
            tracing::debug!("Closing sftp session after upload failed: {}", e);
        }

        Ok(())
    }

    /// Check whether a path exists on the remote device by stat-ing it over sftp.
    pub async fn file_exists<U: Into<String>>(&self, remote_path: U) -> Result<bool, super::Error> {
        let sftp = self.open_sftp().await?;
        let exists = sftp.try_exists(remote_path).await?;

        if let Err(e) = sftp.close().await {
            tracing::debug!("Closing sftp session after stat failed: {}", e);
        }

        Ok(exists)
    }
}
