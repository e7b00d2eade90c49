use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::GenomeAccession;
use crate::error::KiraError;
use crate::transfer::Transferrer;

pub const NCBI_FTP_HOST: &str = "https://ftp.ncbi.nlm.nih.gov";

/// URL of the genomic FASTA for an assembly in the `genomes/all` tree.
///
/// The archive shards assemblies into nested directories named after the
/// accession prefix and each triplet of its numeric body, e.g.
/// `GCF/000/001/405/GCF_000001405_GRCh38/`.
pub fn genome_fasta_url(host: &str, accession: &GenomeAccession, assembly: &str) -> String {
    let [prefix, first, second, third] = accession.shard_segments();
    let stem = format!("{}_{}", accession.as_str(), assembly);
    format!(
        "{}/genomes/all/{prefix}/{first}/{second}/{third}/{stem}/{stem}_genomic.fna.gz",
        host.trim_end_matches('/')
    )
}

/// Validates a raw accession and derives its download URL.
pub fn derive_genome_url(host: &str, accession: &str, assembly: &str) -> Result<String, KiraError> {
    let accession: GenomeAccession = accession.parse()?;
    Ok(genome_fasta_url(host, &accession, assembly))
}

/// Percent-encodes everything outside the unreserved set, leaving `:` and `/`
/// intact so the scheme and path structure survive.
pub fn encode_url(url: &str) -> String {
    url.split('/')
        .map(|segment| {
            segment
                .split(':')
                .map(|part| urlencoding::encode(part).into_owned())
                .collect::<Vec<_>>()
                .join(":")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Last path segment of a URL; this is the name the file is stored under.
pub fn file_name(url: &str) -> Result<&str, KiraError> {
    match url.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(KiraError::InvalidUrl(url.to_string())),
    }
}

/// In-process transfer over HTTPS, for hosts without aria2c.
#[derive(Clone)]
pub struct NcbiHttpClient {
    client: Client,
}

impl NcbiHttpClient {
    pub fn new() -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-gf/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::Http(err.to_string()))?,
        );

        // No overall timeout: assembly FASTA files run to gigabytes.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .build()
            .map_err(|err| KiraError::Http(err.to_string()))?;

        Ok(Self { client })
    }

    fn write_response_to_dir(
        &self,
        mut response: reqwest::blocking::Response,
        name: &str,
        dest_dir: &Path,
    ) -> Result<(), KiraError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(KiraError::HttpStatus { status, message });
        }

        let mut temp = tempfile::Builder::new()
            .prefix(".kira-gf-")
            .suffix(".part")
            .tempfile_in(dest_dir)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| KiraError::Http(err.to_string()))?;

        let destination = dest_dir.join(name);
        if destination.exists() {
            fs::remove_file(&destination).map_err(|err| KiraError::Filesystem(err.to_string()))?;
        }
        temp.persist(&destination)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl Transferrer for NcbiHttpClient {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), KiraError> {
        let name = urlencoding::decode(file_name(url)?)
            .map_err(|err| KiraError::InvalidUrl(err.to_string()))?
            .into_owned();
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| KiraError::Http(err.to_string()))?;
        self.write_response_to_dir(response, &name, dest_dir)
    }
}
