//! FBI Vault FOIA release: 22 parts over a fixed URL template.

use async_stream::stream;

use super::{Adapter, AdapterContext, Discovery, DiscoveryStream};

const BASE_URL: &str = "https://vault.fbi.gov/jeffrey-epstein/Jeffrey%20Epstein%20Part%20{part:02}/at_download/file";
const PART_22_URL: &str =
    "https://vault.fbi.gov/jeffrey-epstein/Jeffrey%20Epstein%20Part%2022%20(Final)/at_download/file";
const TOTAL_PARTS: u32 = 22;

pub struct FbiVaultAdapter;

impl Adapter for FbiVaultAdapter {
    fn name(&self) -> &'static str {
        "fbi_vault"
    }

    fn discover<'a>(&'a self, _ctx: &'a AdapterContext) -> DiscoveryStream<'a> {
        Box::pin(stream! {
            for part in 1..=TOTAL_PARTS {
                let url = if part == 22 {
                    PART_22_URL.to_string()
                } else {
                    BASE_URL.replace("{part:02}", &format!("{:02}", part))
                };

                let meta = serde_json::json!({
                    "source_id": format!("part-{:02}", part),
                    "filename": format!("jeffrey-epstein-fbi-vault-part-{:02}.pdf", part),
                    "title": format!("Jeffrey Epstein FBI Vault Part {} of 22", part),
                    "part": part,
                });
                yield (url, meta) as Discovery;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_22_uses_final_suffix() {
        assert!(PART_22_URL.contains("22%20(Final)"));
    }

    #[test]
    fn test_base_url_template_substitution() {
        let url = BASE_URL.replace("{part:02}", "05");
        assert_eq!(
            url,
            "https://vault.fbi.gov/jeffrey-epstein/Jeffrey%20Epstein%20Part%2005/at_download/file"
        );
    }
}
