//! Catalog manager: create/read/delete operations over one unit of work.
//!
//! One [`CatalogManager`] instance owns one logical unit of work. Every
//! `create_*` and `delete` call stages its row inside a lazily-opened
//! transaction; staged rows are visible to reads on the same manager but
//! nothing is durable until [`CatalogManager::save`]. Concurrent callers
//! use independent manager instances, each bound to its own transaction.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use catalog_common::geometry::{LineString, Polygon};
use catalog_common::{CatalogError, CatalogResult};

use crate::config::CatalogConfig;
use crate::entities::{
    Boundary, Entity, File, FileAccessUri, FileBoundaryLink, FileFormat, FileTagLink, FileType,
    FileTypeParameterLink, FileTypeTagLink, FileUri, Parameter, ParameterLinestring,
    ParameterType, ParameterValue, SpatialRefSys, Tag,
};
use crate::refs::{EntityRef, FileRef};
use crate::schema::Schema;

/// Run a read query on the open transaction when one exists, else on the
/// pool, so staged rows are visible within the unit of work.
macro_rules! fetch_all {
    ($mgr:expr, $query:expr) => {
        match $mgr.tx.as_mut() {
            Some(tx) => $query.fetch_all(&mut **tx).await,
            None => $query.fetch_all(&$mgr.pool).await,
        }
    };
}

/// Database connection pool, schema and pending unit of work.
pub struct CatalogManager {
    pool: PgPool,
    schema: Schema,
    tx: Option<Transaction<'static, Postgres>>,
}

impl CatalogManager {
    /// Create a manager over an existing pool.
    pub fn new(pool: PgPool, schema: &Schema) -> Self {
        Self {
            pool,
            schema: schema.clone(),
            tx: None,
        }
    }

    /// Connect a new pool and create a manager over it.
    pub async fn connect(config: &CatalogConfig, schema: &Schema) -> CatalogResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| CatalogError::Storage(format!("Connection failed: {}", e)))?;

        info!(max_connections = config.max_connections, "catalog connected");
        Ok(Self::new(pool, schema))
    }

    /// The underlying pool, for wiring up a [`crate::QueryEngine`].
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the schema DDL statement by statement.
    pub async fn migrate(&self) -> CatalogResult<()> {
        for statement in self.schema.ddl().split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| CatalogError::Storage(format!("Migration failed: {}", e)))?;
            }
        }

        info!(srid = self.schema.srid(), "catalog schema migrated");
        Ok(())
    }

    // === Unit of work ===

    async fn ensure_tx(&mut self) -> CatalogResult<&mut Transaction<'static, Postgres>> {
        if self.tx.is_none() {
            debug!("opening unit of work");
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| CatalogError::Storage(format!("Failed to begin transaction: {}", e)))?;
            self.tx = Some(tx);
        }

        match self.tx.as_mut() {
            Some(tx) => Ok(tx),
            None => Err(CatalogError::Storage(
                "Transaction unavailable".to_string(),
            )),
        }
    }

    /// Commit the pending unit of work. A failed commit leaves the
    /// transaction rolled back; staged changes are lost.
    pub async fn save(&mut self) -> CatalogResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .map_err(|e| CatalogError::Storage(format!("Commit failed: {}", e)))?;
            debug!("unit of work committed");
        }
        Ok(())
    }

    /// Discard the pending unit of work.
    pub async fn rollback(&mut self) -> CatalogResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback()
                .await
                .map_err(|e| CatalogError::Storage(format!("Rollback failed: {}", e)))?;
            debug!("unit of work rolled back");
        }
        Ok(())
    }

    // === Reference resolution ===

    async fn resolve_file_type(&mut self, r: EntityRef<FileType>) -> CatalogResult<FileType> {
        let (query, what) = match r {
            EntityRef::Value(ft) => return Ok(ft),
            EntityRef::Id(id) => (
                sqlx::query_as::<_, FileType>(
                    "SELECT file_type_id, file_type_name, description \
                     FROM file_type WHERE file_type_id = $1",
                )
                .bind(id),
                format!("file_type id {}", id),
            ),
            EntityRef::Name(ref name) => (
                sqlx::query_as::<_, FileType>(
                    "SELECT file_type_id, file_type_name, description \
                     FROM file_type WHERE file_type_name = $1",
                )
                .bind(name.clone()),
                format!("file_type '{}'", name),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows).ok_or(CatalogError::Reference(what))
    }

    async fn resolve_file_format(&mut self, r: EntityRef<FileFormat>) -> CatalogResult<FileFormat> {
        let (query, what) = match r {
            EntityRef::Value(ff) => return Ok(ff),
            EntityRef::Id(id) => (
                sqlx::query_as::<_, FileFormat>(
                    "SELECT file_format_id, file_format_name, description \
                     FROM file_format WHERE file_format_id = $1",
                )
                .bind(id),
                format!("file_format id {}", id),
            ),
            EntityRef::Name(ref name) => (
                sqlx::query_as::<_, FileFormat>(
                    "SELECT file_format_id, file_format_name, description \
                     FROM file_format WHERE file_format_name = $1",
                )
                .bind(name.clone()),
                format!("file_format '{}'", name),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows).ok_or(CatalogError::Reference(what))
    }

    async fn resolve_parameter_type(
        &mut self,
        r: EntityRef<ParameterType>,
    ) -> CatalogResult<ParameterType> {
        let (query, what) = match r {
            EntityRef::Value(pt) => return Ok(pt),
            EntityRef::Id(id) => (
                sqlx::query_as::<_, ParameterType>(
                    "SELECT parameter_type_id, parameter_type_name, parameter_location \
                     FROM parameter_type WHERE parameter_type_id = $1",
                )
                .bind(id),
                format!("parameter_type id {}", id),
            ),
            EntityRef::Name(ref name) => (
                sqlx::query_as::<_, ParameterType>(
                    "SELECT parameter_type_id, parameter_type_name, parameter_location \
                     FROM parameter_type WHERE parameter_type_name = $1",
                )
                .bind(name.clone()),
                format!("parameter_type '{}'", name),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows).ok_or(CatalogError::Reference(what))
    }

    async fn resolve_parameter(&mut self, r: EntityRef<Parameter>) -> CatalogResult<Parameter> {
        let (query, what) = match r {
            EntityRef::Value(p) => return Ok(p),
            EntityRef::Id(id) => (
                sqlx::query_as::<_, Parameter>(
                    "SELECT parameter_id, parameter_type_id, parameter_name, description \
                     FROM parameter WHERE parameter_id = $1",
                )
                .bind(id),
                format!("parameter id {}", id),
            ),
            EntityRef::Name(ref name) => (
                sqlx::query_as::<_, Parameter>(
                    "SELECT parameter_id, parameter_type_id, parameter_name, description \
                     FROM parameter WHERE parameter_name = $1",
                )
                .bind(name.clone()),
                format!("parameter '{}'", name),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows).ok_or(CatalogError::Reference(what))
    }

    async fn resolve_tag(&mut self, r: EntityRef<Tag>) -> CatalogResult<Tag> {
        let (query, what) = match r {
            EntityRef::Value(t) => return Ok(t),
            EntityRef::Id(id) => (
                sqlx::query_as::<_, Tag>("SELECT tag_id, tag FROM tag WHERE tag_id = $1").bind(id),
                format!("tag id {}", id),
            ),
            EntityRef::Name(ref name) => (
                sqlx::query_as::<_, Tag>("SELECT tag_id, tag FROM tag WHERE tag = $1")
                    .bind(name.clone()),
                format!("tag '{}'", name),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows).ok_or(CatalogError::Reference(what))
    }

    async fn resolve_boundary(&mut self, r: EntityRef<Boundary>) -> CatalogResult<Boundary> {
        let (query, what) = match r {
            EntityRef::Value(b) => return Ok(b),
            EntityRef::Id(id) => (
                sqlx::query_as::<_, BoundaryRow>(
                    "SELECT boundary_id, boundary_name, ST_AsText(boundary) AS boundary, \
                     created_at FROM boundary WHERE boundary_id = $1",
                )
                .bind(id),
                format!("boundary id {}", id),
            ),
            EntityRef::Name(ref name) => (
                sqlx::query_as::<_, BoundaryRow>(
                    "SELECT boundary_id, boundary_name, ST_AsText(boundary) AS boundary, \
                     created_at FROM boundary WHERE boundary_name = $1",
                )
                .bind(name.clone()),
                format!("boundary '{}'", name),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows)
            .ok_or(CatalogError::Reference(what))?
            .into_boundary()
    }

    async fn resolve_file(&mut self, r: FileRef) -> CatalogResult<File> {
        let (query, what) = match r {
            FileRef::Value(f) => return Ok(f),
            FileRef::Uid(ref uid) => (
                sqlx::query_as::<_, File>(
                    "SELECT uid, file_type_id, file_format_id, is_archived, created_at \
                     FROM file WHERE uid = $1",
                )
                .bind(uid.clone()),
                format!("file '{}'", uid),
            ),
        };

        let rows = fetch_all!(self, query)
            .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;
        exactly_one(rows).ok_or(CatalogError::Reference(what))
    }

    // === Create operations ===

    pub async fn create_file_type(
        &mut self,
        file_type_id: i32,
        file_type_name: &str,
        description: &str,
    ) -> CatalogResult<FileType> {
        let file_type = FileType {
            file_type_id,
            file_type_name: file_type_name.to_string(),
            description: description.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO file_type (file_type_id, file_type_name, description) \
             VALUES ($1, $2, $3)",
        )
        .bind(file_type.file_type_id)
        .bind(&file_type.file_type_name)
        .bind(&file_type.description)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(file_type_id, file_type_name, "staged file_type");
        Ok(file_type)
    }

    pub async fn create_file_format(
        &mut self,
        file_format_id: i32,
        file_format_name: &str,
        description: &str,
    ) -> CatalogResult<FileFormat> {
        let file_format = FileFormat {
            file_format_id,
            file_format_name: file_format_name.to_string(),
            description: description.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO file_format (file_format_id, file_format_name, description) \
             VALUES ($1, $2, $3)",
        )
        .bind(file_format.file_format_id)
        .bind(&file_format.file_format_name)
        .bind(&file_format.description)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(file_format_id, file_format_name, "staged file_format");
        Ok(file_format)
    }

    pub async fn create_parameter_type(
        &mut self,
        parameter_type_id: i32,
        parameter_type_name: &str,
        parameter_location: &str,
    ) -> CatalogResult<ParameterType> {
        let parameter_type = ParameterType {
            parameter_type_id,
            parameter_type_name: parameter_type_name.to_string(),
            parameter_location: parameter_location.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO parameter_type (parameter_type_id, parameter_type_name, \
             parameter_location) VALUES ($1, $2, $3)",
        )
        .bind(parameter_type.parameter_type_id)
        .bind(&parameter_type.parameter_type_name)
        .bind(&parameter_type.parameter_location)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(parameter_type_id, "staged parameter_type");
        Ok(parameter_type)
    }

    /// Create a parameter. `type_ref` must resolve to an existing
    /// [`ParameterType`].
    pub async fn create_parameter(
        &mut self,
        parameter_id: i32,
        type_ref: impl Into<EntityRef<ParameterType>>,
        parameter_name: &str,
        description: &str,
    ) -> CatalogResult<Parameter> {
        let parameter_type = self.resolve_parameter_type(type_ref.into()).await?;
        let parameter = Parameter {
            parameter_id,
            parameter_type_id: parameter_type.parameter_type_id,
            parameter_name: parameter_name.to_string(),
            description: description.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO parameter (parameter_id, parameter_type_id, parameter_name, \
             description) VALUES ($1, $2, $3, $4)",
        )
        .bind(parameter.parameter_id)
        .bind(parameter.parameter_type_id)
        .bind(&parameter.parameter_name)
        .bind(&parameter.description)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(parameter_id, parameter_name, "staged parameter");
        Ok(parameter)
    }

    pub async fn create_tag(&mut self, tag_id: i32, tag: &str) -> CatalogResult<Tag> {
        let tag_obj = Tag {
            tag_id,
            tag: tag.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query("INSERT INTO tag (tag_id, tag) VALUES ($1, $2)")
            .bind(tag_obj.tag_id)
            .bind(&tag_obj.tag)
            .execute(&mut **tx)
            .await
            .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(tag_id, tag, "staged tag");
        Ok(tag_obj)
    }

    pub async fn create_boundary(
        &mut self,
        boundary_id: i32,
        boundary_name: &str,
        boundary: &Polygon,
        created_at: Option<DateTime<Utc>>,
    ) -> CatalogResult<Boundary> {
        let boundary_obj = Boundary {
            boundary_id,
            boundary_name: boundary_name.to_string(),
            boundary: boundary.clone(),
            created_at: created_at.unwrap_or_else(Utc::now),
        };

        let wkt = boundary.to_wkt();
        let srid = self.schema.srid();
        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO boundary (boundary_id, boundary_name, boundary, created_at) \
             VALUES ($1, $2, ST_GeomFromText($3, $4), $5)",
        )
        .bind(boundary_obj.boundary_id)
        .bind(&boundary_obj.boundary_name)
        .bind(&wkt)
        .bind(srid)
        .bind(boundary_obj.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(boundary_id, boundary_name, "staged boundary");
        Ok(boundary_obj)
    }

    /// Create a file. Exactly one of the three reference forms (value, id,
    /// name) is carried by each [`EntityRef`]; an unresolvable reference
    /// fails before anything is staged. `created_at` defaults to a fresh
    /// `Utc::now()` per call.
    pub async fn create_file(
        &mut self,
        uid: &str,
        file_type: impl Into<EntityRef<FileType>>,
        file_format: impl Into<EntityRef<FileFormat>>,
        is_archived: bool,
        created_at: Option<DateTime<Utc>>,
    ) -> CatalogResult<File> {
        let file_type = self.resolve_file_type(file_type.into()).await?;
        let file_format = self.resolve_file_format(file_format.into()).await?;

        let file = File {
            uid: uid.to_string(),
            file_type_id: file_type.file_type_id,
            file_format_id: file_format.file_format_id,
            is_archived,
            created_at: created_at.unwrap_or_else(Utc::now),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO file (uid, file_type_id, file_format_id, is_archived, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&file.uid)
        .bind(file.file_type_id)
        .bind(file.file_format_id)
        .bind(file.is_archived)
        .bind(file.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(uid, "staged file");
        Ok(file)
    }

    /// Declare which parameters a file type may carry. All references are
    /// resolved before any link is staged; an empty parameter list is a
    /// reference error.
    pub async fn create_file_type_parameter(
        &mut self,
        file_type: impl Into<EntityRef<FileType>>,
        parameters: &[EntityRef<Parameter>],
    ) -> CatalogResult<Vec<FileTypeParameterLink>> {
        if parameters.is_empty() {
            return Err(CatalogError::Reference(
                "No parameter reference supplied".to_string(),
            ));
        }

        let file_type = self.resolve_file_type(file_type.into()).await?;
        let mut resolved = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            resolved.push(self.resolve_parameter(parameter.clone()).await?);
        }

        let mut links = Vec::with_capacity(resolved.len());
        for parameter in resolved {
            let link = FileTypeParameterLink {
                file_type_id: file_type.file_type_id,
                parameter_id: parameter.parameter_id,
            };

            let tx = self.ensure_tx().await?;
            sqlx::query(
                "INSERT INTO file_type_parameter (file_type_id, parameter_id) VALUES ($1, $2)",
            )
            .bind(link.file_type_id)
            .bind(link.parameter_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

            links.push(link);
        }

        debug!(
            file_type_id = file_type.file_type_id,
            count = links.len(),
            "staged file_type_parameter links"
        );
        Ok(links)
    }

    /// Record a scalar observation of a parameter for a file.
    pub async fn create_parameter_value(
        &mut self,
        data_value: &str,
        file: impl Into<FileRef>,
        parameter: impl Into<EntityRef<Parameter>>,
        created_at: Option<DateTime<Utc>>,
    ) -> CatalogResult<ParameterValue> {
        let file = self.resolve_file(file.into()).await?;
        let parameter = self.resolve_parameter(parameter.into()).await?;

        let value = ParameterValue {
            uid: file.uid,
            parameter_id: parameter.parameter_id,
            data_value: data_value.to_string(),
            created_at: created_at.unwrap_or_else(Utc::now),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO parameter_value (uid, parameter_id, data_value, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&value.uid)
        .bind(value.parameter_id)
        .bind(&value.data_value)
        .bind(value.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(uid = %value.uid, parameter_id = value.parameter_id, "staged parameter_value");
        Ok(value)
    }

    /// Record the spatial footprint of a parameter's observation for a
    /// file. The planar linestring is stored as a geodetic geography value.
    pub async fn create_parameter_linestring(
        &mut self,
        linestring: &LineString,
        file: impl Into<FileRef>,
        parameter: impl Into<EntityRef<Parameter>>,
        created_at: Option<DateTime<Utc>>,
    ) -> CatalogResult<ParameterLinestring> {
        let file = self.resolve_file(file.into()).await?;
        let parameter = self.resolve_parameter(parameter.into()).await?;

        let record = ParameterLinestring {
            uid: file.uid,
            parameter_id: parameter.parameter_id,
            data_value: linestring.clone(),
            created_at: created_at.unwrap_or_else(Utc::now),
        };

        let ewkt = format!("SRID={};{}", self.schema.srid(), linestring.to_wkt());
        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO parameter_linestring (uid, parameter_id, data_value, created_at) \
             VALUES ($1, $2, ST_GeogFromText($3), $4)",
        )
        .bind(&record.uid)
        .bind(record.parameter_id)
        .bind(&ewkt)
        .bind(record.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(uid = %record.uid, parameter_id = record.parameter_id, "staged parameter_linestring");
        Ok(record)
    }

    pub async fn create_file_uri(&mut self, uid: &str, uri: &str) -> CatalogResult<FileUri> {
        let file_uri = FileUri {
            uid: uid.to_string(),
            uri: uri.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query("INSERT INTO file_uri (uid, uri) VALUES ($1, $2)")
            .bind(&file_uri.uid)
            .bind(&file_uri.uri)
            .execute(&mut **tx)
            .await
            .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(uid, uri, "staged file_uri");
        Ok(file_uri)
    }

    /// Register a templated access-URI pattern for a type/format pair.
    pub async fn create_file_access_uri(
        &mut self,
        file_type: impl Into<EntityRef<FileType>>,
        file_format: impl Into<EntityRef<FileFormat>>,
        sequence: i32,
        uri: &str,
    ) -> CatalogResult<FileAccessUri> {
        let file_type = self.resolve_file_type(file_type.into()).await?;
        let file_format = self.resolve_file_format(file_format.into()).await?;

        let access_uri = FileAccessUri {
            file_type_id: file_type.file_type_id,
            file_format_id: file_format.file_format_id,
            sequence,
            uri: uri.to_string(),
        };

        let tx = self.ensure_tx().await?;
        sqlx::query(
            "INSERT INTO file_access_uri (file_type_id, file_format_id, sequence, uri) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(access_uri.file_type_id)
        .bind(access_uri.file_format_id)
        .bind(access_uri.sequence)
        .bind(&access_uri.uri)
        .execute(&mut **tx)
        .await
        .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(sequence, uri, "staged file_access_uri");
        Ok(access_uri)
    }

    /// Associate a tag with a file.
    pub async fn create_file_tag(
        &mut self,
        file: impl Into<FileRef>,
        tag: impl Into<EntityRef<Tag>>,
    ) -> CatalogResult<FileTagLink> {
        let file = self.resolve_file(file.into()).await?;
        let tag = self.resolve_tag(tag.into()).await?;

        let link = FileTagLink {
            uid: file.uid,
            tag_id: tag.tag_id,
        };

        let tx = self.ensure_tx().await?;
        sqlx::query("INSERT INTO file_tag (uid, tag_id) VALUES ($1, $2)")
            .bind(&link.uid)
            .bind(link.tag_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(uid = %link.uid, tag_id = link.tag_id, "staged file_tag link");
        Ok(link)
    }

    /// Associate a tag with a file type.
    pub async fn create_file_type_tag(
        &mut self,
        file_type: impl Into<EntityRef<FileType>>,
        tag: impl Into<EntityRef<Tag>>,
    ) -> CatalogResult<FileTypeTagLink> {
        let file_type = self.resolve_file_type(file_type.into()).await?;
        let tag = self.resolve_tag(tag.into()).await?;

        let link = FileTypeTagLink {
            file_type_id: file_type.file_type_id,
            tag_id: tag.tag_id,
        };

        let tx = self.ensure_tx().await?;
        sqlx::query("INSERT INTO file_type_tag (file_type_id, tag_id) VALUES ($1, $2)")
            .bind(link.file_type_id)
            .bind(link.tag_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(file_type_id = link.file_type_id, tag_id = link.tag_id, "staged file_type_tag link");
        Ok(link)
    }

    /// Associate a file with a named boundary.
    pub async fn create_file_boundary(
        &mut self,
        file: impl Into<FileRef>,
        boundary: impl Into<EntityRef<Boundary>>,
    ) -> CatalogResult<FileBoundaryLink> {
        let file = self.resolve_file(file.into()).await?;
        let boundary = self.resolve_boundary(boundary.into()).await?;

        let link = FileBoundaryLink {
            uid: file.uid,
            boundary_id: boundary.boundary_id,
        };

        let tx = self.ensure_tx().await?;
        sqlx::query("INSERT INTO data_boundary (uid, boundary_id) VALUES ($1, $2)")
            .bind(&link.uid)
            .bind(link.boundary_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| CatalogError::Storage(format!("Insert failed: {}", e)))?;

        debug!(uid = %link.uid, boundary_id = link.boundary_id, "staged data_boundary link");
        Ok(link)
    }

    // === Lookups ===

    pub async fn get_file_type(&mut self, file_type_name: &str) -> CatalogResult<FileType> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, FileType>(
                "SELECT file_type_id, file_type_name, description \
                 FROM file_type WHERE file_type_name = $1",
            )
            .bind(file_type_name)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        unique(rows, &format!("file_type '{}'", file_type_name))
    }

    pub async fn get_file_format(&mut self, file_format_name: &str) -> CatalogResult<FileFormat> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, FileFormat>(
                "SELECT file_format_id, file_format_name, description \
                 FROM file_format WHERE file_format_name = $1",
            )
            .bind(file_format_name)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        unique(rows, &format!("file_format '{}'", file_format_name))
    }

    pub async fn get_parameter(&mut self, parameter_name: &str) -> CatalogResult<Parameter> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, Parameter>(
                "SELECT parameter_id, parameter_type_id, parameter_name, description \
                 FROM parameter WHERE parameter_name = $1",
            )
            .bind(parameter_name)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        unique(rows, &format!("parameter '{}'", parameter_name))
    }

    pub async fn get_file(&mut self, uid: &str) -> CatalogResult<File> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, File>(
                "SELECT uid, file_type_id, file_format_id, is_archived, created_at \
                 FROM file WHERE uid = $1",
            )
            .bind(uid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        unique(rows, &format!("file '{}'", uid))
    }

    pub async fn get_boundary(&mut self, boundary_name: &str) -> CatalogResult<Boundary> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, BoundaryRow>(
                "SELECT boundary_id, boundary_name, ST_AsText(boundary) AS boundary, \
                 created_at FROM boundary WHERE boundary_name = $1",
            )
            .bind(boundary_name)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        unique(rows, &format!("boundary '{}'", boundary_name))?.into_boundary()
    }

    /// Look up reference-system metadata from the PostGIS lookup table.
    pub async fn get_spatial_ref_sys(&mut self, srid: i32) -> CatalogResult<SpatialRefSys> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, SpatialRefSys>(
                "SELECT srid, auth_name, auth_srid, srtext, proj4text \
                 FROM spatial_ref_sys WHERE srid = $1",
            )
            .bind(srid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        unique(rows, &format!("spatial_ref_sys {}", srid))
    }

    /// All files whose `created_at` lies strictly between `oldest` and
    /// `newest`, optionally restricted to one file type. `oldest` defaults
    /// to the year-1 floor, `newest` to a fresh `Utc::now()`.
    pub async fn get_files(
        &mut self,
        file_type_name: Option<&str>,
        oldest: Option<DateTime<Utc>>,
        newest: Option<DateTime<Utc>>,
    ) -> CatalogResult<Vec<File>> {
        let oldest = oldest.unwrap_or_else(earliest_timestamp);
        let newest = newest.unwrap_or_else(Utc::now);

        let rows = match file_type_name {
            None => fetch_all!(
                self,
                sqlx::query_as::<_, File>(
                    "SELECT uid, file_type_id, file_format_id, is_archived, created_at \
                     FROM file WHERE created_at > $1 AND created_at < $2",
                )
                .bind(oldest)
                .bind(newest)
            ),
            Some(name) => fetch_all!(
                self,
                sqlx::query_as::<_, File>(
                    "SELECT f.uid, f.file_type_id, f.file_format_id, f.is_archived, \
                     f.created_at FROM file f \
                     JOIN file_type ft ON ft.file_type_id = f.file_type_id \
                     WHERE ft.file_type_name = $1 \
                     AND f.created_at > $2 AND f.created_at < $3",
                )
                .bind(name)
                .bind(oldest)
                .bind(newest)
            ),
        }
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        Ok(rows)
    }

    // === Association reads ===

    pub async fn parameter_values_for(&mut self, uid: &str) -> CatalogResult<Vec<ParameterValue>> {
        fetch_all!(
            self,
            sqlx::query_as::<_, ParameterValue>(
                "SELECT uid, parameter_id, data_value, created_at \
                 FROM parameter_value WHERE uid = $1",
            )
            .bind(uid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))
    }

    pub async fn parameter_linestrings_for(
        &mut self,
        uid: &str,
    ) -> CatalogResult<Vec<ParameterLinestring>> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, ParameterLinestringRow>(
                "SELECT uid, parameter_id, ST_AsText(data_value) AS data_value, created_at \
                 FROM parameter_linestring WHERE uid = $1",
            )
            .bind(uid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        rows.into_iter().map(|r| r.into_linestring()).collect()
    }

    pub async fn tags_for_file(&mut self, uid: &str) -> CatalogResult<Vec<Tag>> {
        fetch_all!(
            self,
            sqlx::query_as::<_, Tag>(
                "SELECT t.tag_id, t.tag FROM tag t \
                 JOIN file_tag ft ON ft.tag_id = t.tag_id WHERE ft.uid = $1",
            )
            .bind(uid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))
    }

    pub async fn boundaries_for_file(&mut self, uid: &str) -> CatalogResult<Vec<Boundary>> {
        let rows = fetch_all!(
            self,
            sqlx::query_as::<_, BoundaryRow>(
                "SELECT b.boundary_id, b.boundary_name, ST_AsText(b.boundary) AS boundary, \
                 b.created_at FROM boundary b \
                 JOIN data_boundary db ON db.boundary_id = b.boundary_id WHERE db.uid = $1",
            )
            .bind(uid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        rows.into_iter().map(|r| r.into_boundary()).collect()
    }

    pub async fn uris_for_file(&mut self, uid: &str) -> CatalogResult<Vec<FileUri>> {
        fetch_all!(
            self,
            sqlx::query_as::<_, FileUri>("SELECT uid, uri FROM file_uri WHERE uid = $1").bind(uid)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))
    }

    pub async fn parameters_for_file_type(
        &mut self,
        file_type_name: &str,
    ) -> CatalogResult<Vec<Parameter>> {
        fetch_all!(
            self,
            sqlx::query_as::<_, Parameter>(
                "SELECT p.parameter_id, p.parameter_type_id, p.parameter_name, p.description \
                 FROM parameter p \
                 JOIN file_type_parameter ftp ON ftp.parameter_id = p.parameter_id \
                 JOIN file_type ft ON ft.file_type_id = ftp.file_type_id \
                 WHERE ft.file_type_name = $1",
            )
            .bind(file_type_name)
        )
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))
    }

    // === Deletion ===

    /// Stage removal of a catalog entity. Dependent rows of a file are
    /// removed by the schema's cascade rules; referenced definitions
    /// (parameter, tag, boundary) are never touched.
    pub async fn delete(&mut self, entity: &Entity) -> CatalogResult<()> {
        let tx = self.ensure_tx().await?;
        let result = match entity {
            Entity::FileType(ft) => {
                sqlx::query("DELETE FROM file_type WHERE file_type_id = $1")
                    .bind(ft.file_type_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::FileFormat(ff) => {
                sqlx::query("DELETE FROM file_format WHERE file_format_id = $1")
                    .bind(ff.file_format_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::ParameterType(pt) => {
                sqlx::query("DELETE FROM parameter_type WHERE parameter_type_id = $1")
                    .bind(pt.parameter_type_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::Parameter(p) => {
                sqlx::query("DELETE FROM parameter WHERE parameter_id = $1")
                    .bind(p.parameter_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::Tag(t) => {
                sqlx::query("DELETE FROM tag WHERE tag_id = $1")
                    .bind(t.tag_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::Boundary(b) => {
                sqlx::query("DELETE FROM boundary WHERE boundary_id = $1")
                    .bind(b.boundary_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::File(f) => {
                sqlx::query("DELETE FROM file WHERE uid = $1")
                    .bind(&f.uid)
                    .execute(&mut **tx)
                    .await
            }
            Entity::FileUri(u) => {
                sqlx::query("DELETE FROM file_uri WHERE uid = $1 AND uri = $2")
                    .bind(&u.uid)
                    .bind(&u.uri)
                    .execute(&mut **tx)
                    .await
            }
            Entity::FileAccessUri(u) => {
                sqlx::query(
                    "DELETE FROM file_access_uri WHERE file_type_id = $1 \
                     AND file_format_id = $2 AND sequence = $3 AND uri = $4",
                )
                .bind(u.file_type_id)
                .bind(u.file_format_id)
                .bind(u.sequence)
                .bind(&u.uri)
                .execute(&mut **tx)
                .await
            }
            Entity::ParameterValue(pv) => {
                sqlx::query("DELETE FROM parameter_value WHERE uid = $1 AND parameter_id = $2")
                    .bind(&pv.uid)
                    .bind(pv.parameter_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::ParameterLinestring(pl) => {
                sqlx::query(
                    "DELETE FROM parameter_linestring WHERE uid = $1 AND parameter_id = $2",
                )
                .bind(&pl.uid)
                .bind(pl.parameter_id)
                .execute(&mut **tx)
                .await
            }
            Entity::FileTagLink(l) => {
                sqlx::query("DELETE FROM file_tag WHERE uid = $1 AND tag_id = $2")
                    .bind(&l.uid)
                    .bind(l.tag_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::FileBoundaryLink(l) => {
                sqlx::query("DELETE FROM data_boundary WHERE uid = $1 AND boundary_id = $2")
                    .bind(&l.uid)
                    .bind(l.boundary_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::FileTypeTagLink(l) => {
                sqlx::query("DELETE FROM file_type_tag WHERE file_type_id = $1 AND tag_id = $2")
                    .bind(l.file_type_id)
                    .bind(l.tag_id)
                    .execute(&mut **tx)
                    .await
            }
            Entity::FileTypeParameterLink(l) => {
                sqlx::query(
                    "DELETE FROM file_type_parameter WHERE file_type_id = $1 \
                     AND parameter_id = $2",
                )
                .bind(l.file_type_id)
                .bind(l.parameter_id)
                .execute(&mut **tx)
                .await
            }
        };

        result.map_err(|e| CatalogError::Storage(format!("Delete failed: {}", e)))?;
        debug!("staged delete");
        Ok(())
    }
}

/// Internal row type carrying boundary geometry as WKT text.
#[derive(FromRow)]
struct BoundaryRow {
    boundary_id: i32,
    boundary_name: String,
    boundary: String,
    created_at: DateTime<Utc>,
}

impl BoundaryRow {
    fn into_boundary(self) -> CatalogResult<Boundary> {
        let polygon = Polygon::from_wkt(&self.boundary)
            .map_err(|e| CatalogError::Storage(format!("Invalid polygon in store: {}", e)))?;
        Ok(Boundary {
            boundary_id: self.boundary_id,
            boundary_name: self.boundary_name,
            boundary: polygon,
            created_at: self.created_at,
        })
    }
}

/// Internal row type carrying footprint geometry as WKT text.
#[derive(FromRow)]
struct ParameterLinestringRow {
    uid: String,
    parameter_id: i32,
    data_value: String,
    created_at: DateTime<Utc>,
}

impl ParameterLinestringRow {
    fn into_linestring(self) -> CatalogResult<ParameterLinestring> {
        let line = LineString::from_wkt(&self.data_value)
            .map_err(|e| CatalogError::Storage(format!("Invalid linestring in store: {}", e)))?;
        Ok(ParameterLinestring {
            uid: self.uid,
            parameter_id: self.parameter_id,
            data_value: line,
            created_at: self.created_at,
        })
    }
}

/// Some value iff the row set holds exactly one row.
fn exactly_one<T>(mut rows: Vec<T>) -> Option<T> {
    if rows.len() == 1 {
        Some(rows.remove(0))
    } else {
        None
    }
}

/// Exactly one row, or a NotFound error naming the lookup.
fn unique<T>(rows: Vec<T>, what: &str) -> CatalogResult<T> {
    let count = rows.len();
    exactly_one(rows).ok_or_else(|| {
        CatalogError::NotFound(format!("{} matched {} rows, expected exactly one", what, count))
    })
}

/// Floor for open-ended `get_files` intervals, kept within the range the
/// storage engine can represent.
fn earliest_timestamp() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one() {
        assert_eq!(exactly_one(vec![1]), Some(1));
        assert_eq!(exactly_one(Vec::<i32>::new()), None);
        assert_eq!(exactly_one(vec![1, 2]), None);
    }

    #[test]
    fn test_unique_errors_name_the_lookup() {
        let err = unique(Vec::<i32>::new(), "file 'F001'").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert!(err.to_string().contains("F001"));

        let err = unique(vec![1, 2], "parameter 'x'").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_earliest_timestamp_is_year_one() {
        let floor = earliest_timestamp();
        assert_eq!(floor.format("%Y-%m-%d").to_string(), "0001-01-01");
    }
}
