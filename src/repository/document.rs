use bytemuck::allocation::pod_collect_to_vec;
use chrono::Utc;
use diesel::prelude::*;

use crate::domain::document::{EmbeddedDocument, StoredDocument, StoredEmbedding};
use crate::models::document::{Document as DbDocument, NewDocument};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{DieselRepository, DocumentReader, DocumentWriter};

/// Decode a little-endian `f32` blob written by [`NewDocument`].
pub fn decode_embedding(blob: &[u8]) -> RepositoryResult<Vec<f32>> {
    if blob.len() % size_of::<f32>() != 0 {
        return Err(RepositoryError::ValidationError(format!(
            "embedding blob of {} bytes is not a whole number of f32 values",
            blob.len()
        )));
    }
    Ok(pod_collect_to_vec::<u8, f32>(blob))
}

impl DocumentReader for DieselRepository {
    fn list_embeddings(
        &self,
        jurisdiction_a: &str,
        jurisdiction_b: &str,
        ontology_id: Option<&str>,
    ) -> RepositoryResult<Vec<StoredEmbedding>> {
        use crate::repository::schema::reginsights_clean;

        let mut conn = self.conn()?;

        let mut query = reginsights_clean::table
            .select((
                reginsights_clean::jurisdiction,
                reginsights_clean::time_bucket,
                reginsights_clean::embedding,
            ))
            .filter(reginsights_clean::jurisdiction.eq_any([jurisdiction_a, jurisdiction_b]))
            .filter(reginsights_clean::embedding.is_not_null())
            .order((
                reginsights_clean::jurisdiction.asc(),
                reginsights_clean::time_bucket.asc(),
            ))
            .into_boxed();

        if let Some(ontology_id) = ontology_id {
            query = query.filter(reginsights_clean::ontology_id.eq(ontology_id));
        }

        let rows = query.load::<(String, String, Option<Vec<u8>>)>(&mut conn)?;

        let mut embeddings = Vec::with_capacity(rows.len());
        for (jurisdiction, time_bucket, blob) in rows {
            let Some(blob) = blob else { continue };
            match decode_embedding(&blob) {
                Ok(embedding) => embeddings.push(StoredEmbedding {
                    jurisdiction,
                    time_bucket,
                    embedding,
                }),
                Err(e) => log::error!(
                    "Failed to parse embedding for {jurisdiction} in time bucket {time_bucket}: {e}"
                ),
            }
        }

        Ok(embeddings)
    }

    fn list_jurisdictions(&self) -> RepositoryResult<Vec<String>> {
        use crate::repository::schema::reginsights_clean;

        let mut conn = self.conn()?;

        let jurisdictions = reginsights_clean::table
            .select(reginsights_clean::jurisdiction)
            .distinct()
            .order(reginsights_clean::jurisdiction.asc())
            .load::<String>(&mut conn)?;

        Ok(jurisdictions)
    }

    fn get_document(&self, doc_id: &str) -> RepositoryResult<StoredDocument> {
        use crate::repository::schema::reginsights_clean;

        let mut conn = self.conn()?;

        let row = reginsights_clean::table
            .find(doc_id)
            .select(DbDocument::as_select())
            .first::<DbDocument>(&mut conn)?;

        let embedding = row.embedding.as_deref().map(decode_embedding).transpose()?;
        let time_bucket = row.time_bucket.clone();

        Ok(StoredDocument {
            document: row.into(),
            time_bucket,
            embedding,
        })
    }

    fn count_documents(&self) -> RepositoryResult<i64> {
        use crate::repository::schema::reginsights_clean;

        let mut conn = self.conn()?;

        let count = reginsights_clean::table
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }
}

impl DocumentWriter for DieselRepository {
    fn upsert_documents(&self, documents: &[EmbeddedDocument]) -> RepositoryResult<usize> {
        use crate::repository::schema::reginsights_clean;

        if documents.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let updated_at = Utc::now().naive_utc();

        let affected = conn.transaction(|conn| {
            let mut affected_rows = 0;
            for item in documents {
                let row = NewDocument::from_embedded(item, updated_at);
                affected_rows += diesel::insert_into(reginsights_clean::table)
                    .values(&row)
                    .on_conflict(reginsights_clean::doc_id)
                    .do_update()
                    .set(&row)
                    .execute(conn)?;
            }
            Ok::<usize, RepositoryError>(affected_rows)
        })?;

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::cast_slice;

    use super::decode_embedding;
    use crate::repository::errors::RepositoryError;

    #[test]
    fn decodes_blob_written_as_f32_bytes() {
        let values = [0.25_f32, -1.0, 3.5];
        let blob: Vec<u8> = cast_slice(values.as_slice()).to_vec();

        assert_eq!(decode_embedding(&blob).unwrap(), values.to_vec());
    }

    #[test]
    fn decodes_unaligned_blob() {
        let values = [1.0_f32, 2.0];
        let mut padded = vec![0_u8];
        padded.extend_from_slice(cast_slice(values.as_slice()));

        assert_eq!(decode_embedding(&padded[1..]).unwrap(), values.to_vec());
    }

    #[test]
    fn rejects_truncated_blob() {
        assert!(matches!(
            decode_embedding(&[0, 0, 128]),
            Err(RepositoryError::ValidationError(_))
        ));
    }
}
