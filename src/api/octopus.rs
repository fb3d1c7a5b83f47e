//! [Octopus Energy REST API](https://developer.octopus.energy/rest/reference) client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    api::{TariffProvider, client},
    core::tariff::TariffRate,
    prelude::*,
};

pub struct Api {
    client: Client,
    base_url: Url,

    /// Grid supply point group, `A` to `P`.
    region: char,
}

impl Api {
    pub fn try_new(region: char) -> Result<Self> {
        Ok(Self {
            client: client::try_new()?,
            base_url: Url::parse("https://api.octopus.energy/v1/")?,
            region: region.to_ascii_uppercase(),
        })
    }

    /// Single-register electricity tariff code of the product in the region.
    fn tariff_code(&self, product_code: &str) -> String {
        format!("E-1R-{product_code}-{}", self.region)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    /// Fetch all the pages, following the `next` links.
    async fn get_all<T: DeserializeOwned>(&self, mut url: Url) -> Result<Vec<T>> {
        let mut results = Vec::new();
        loop {
            debug!(%url, "fetching…");
            let page = self
                .client
                .get(url)
                .send()
                .await
                .context("failed to call")?
                .error_for_status()
                .context("request failed")?
                .json::<Page<T>>()
                .await
                .context("failed to deserialize the response")?;
            results.extend(page.results);
            match page.next {
                Some(next) => url = Url::parse(&next).context("invalid next page URL")?,
                None => break Ok(results),
            }
        }
    }
}

#[async_trait]
impl TariffProvider for Api {
    #[instrument(skip_all, fields(display_name = display_name))]
    async fn get_product_code(&self, display_name: &str) -> Result<Option<String>> {
        let products = self.get_all::<Product>(self.url(&["products"])?).await?;
        info!(n_products = products.len(), "fetched");
        Ok(products
            .into_iter()
            .find(|product| product.display_name == display_name)
            .map(|product| product.code))
    }

    #[instrument(skip_all, fields(product_code = product_code, from = %from, until = %until))]
    async fn get_unit_rates(
        &self,
        product_code: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TariffRate>> {
        let tariff_code = self.tariff_code(product_code);
        let mut url = self.url(&[
            "products",
            product_code,
            "electricity-tariffs",
            &tariff_code,
            "standard-unit-rates",
        ])?;
        let query = PeriodQuery { period_from: from, period_to: until, page_size: 1500 };
        url.set_query(Some(&serde_qs::to_string(&query)?));
        let rates = self.get_all::<TariffRate>(url).await?;
        info!(n_rates = rates.len(), "fetched");
        Ok(rates)
    }
}

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,

    results: Vec<T>,
}

#[derive(Deserialize)]
struct Product {
    code: String,
    display_name: String,
}

#[derive(Serialize)]
struct PeriodQuery {
    period_from: DateTime<Utc>,
    period_to: DateTime<Utc>,
    page_size: u32,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{Days, TimeZone};

    use super::*;

    #[test]
    fn test_tariff_code() -> Result {
        assert_eq!(Api::try_new('c')?.tariff_code("AGILE-24-10-01"), "E-1R-AGILE-24-10-01-C");
        Ok(())
    }

    #[test]
    fn test_url() -> Result {
        let url = Api::try_new('C')?.url(&["products", "VAR-22-11-01", "electricity-tariffs"])?;
        assert_eq!(
            url.as_str(),
            "https://api.octopus.energy/v1/products/VAR-22-11-01/electricity-tariffs/"
        );
        Ok(())
    }

    #[test]
    fn test_deserialize_unit_rates_ok() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "count": 2,
                "next": "https://api.octopus.energy/v1/products/AGILE-24-10-01/electricity-tariffs/E-1R-AGILE-24-10-01-C/standard-unit-rates/?page=2",
                "previous": null,
                "results": [
                    {
                        "value_exc_vat": 19.49,
                        "value_inc_vat": 20.4645,
                        "valid_from": "2025-01-10T22:30:00Z",
                        "valid_to": "2025-01-10T23:00:00Z",
                        "payment_method": null
                    },
                    {
                        "value_exc_vat": 18.2,
                        "value_inc_vat": 19.11,
                        "valid_from": "2025-01-10T22:00:00Z",
                        "valid_to": null,
                        "payment_method": null
                    }
                ]
            }
        "#;
        let page = serde_json::from_str::<Page<TariffRate>>(RESPONSE)?;
        let next = Url::parse(page.next.as_deref().unwrap())?;
        assert_eq!(next.query(), Some("page=2"));
        assert_eq!(page.results.len(), 2);
        assert_abs_diff_eq!(page.results[0].value_inc_vat.0, 20.4645);
        assert!(page.results[1].valid_to.is_none());
        Ok(())
    }

    #[test]
    fn test_deserialize_products_ok() -> Result {
        // language=JSON
        const RESPONSE: &str = r#"
            {
                "count": 1,
                "next": null,
                "previous": null,
                "results": [
                    {
                        "code": "VAR-22-11-01",
                        "direction": "IMPORT",
                        "full_name": "Flexible Octopus November 2022 v1",
                        "display_name": "Flexible Octopus",
                        "brand": "OCTOPUS_ENERGY"
                    }
                ]
            }
        "#;
        let page = serde_json::from_str::<Page<Product>>(RESPONSE)?;
        assert!(page.next.is_none());
        assert_eq!(page.results[0].code, "VAR-22-11-01");
        assert_eq!(page.results[0].display_name, "Flexible Octopus");
        Ok(())
    }

    #[tokio::test]
    #[ignore = "makes the API request"]
    async fn test_get_product_code_ok() -> Result {
        let code = Api::try_new('C')?.get_product_code("Flexible Octopus").await?;
        assert!(code.is_some());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "makes the API request"]
    async fn test_get_unit_rates_ok() -> Result {
        let until = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let from = until - Days::new(1);
        let rates = Api::try_new('C')?.get_unit_rates("AGILE-24-10-01", from, until).await?;
        assert!(!rates.is_empty());
        Ok(())
    }
}
