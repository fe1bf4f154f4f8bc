//! [`EntityStore`] over `PostgreSQL`.
//!
//! Floors are `INTEGER` columns and enums are `TEXT` columns holding the
//! variant names. Rows are fetched into `*Row` structs and converted to
//! domain types, failing with [`DbError::Decode`] on any value the domain
//! cannot represent.

use chrono::{DateTime, Utc};
use liftsim_types::{
    Assignment, Building, BuildingId, Call, CallId, Elevator, ElevatorId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::store::{EntityStore, StepCommit};

/// `PostgreSQL`-backed entity store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct BuildingRow {
    id: Uuid,
    name: String,
    floor_count: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ElevatorRow {
    id: Uuid,
    building_id: Uuid,
    current_floor: i32,
    status: String,
    direction: String,
    door_status: String,
}

/// Elevator columns prefixed `e_` joined with building columns prefixed `b_`.
#[derive(Debug, sqlx::FromRow)]
struct ElevatorBuildingRow {
    e_id: Uuid,
    e_current_floor: i32,
    e_status: String,
    e_direction: String,
    e_door_status: String,
    b_id: Uuid,
    b_name: String,
    b_floor_count: i32,
    b_created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CallRow {
    id: Uuid,
    building_id: Uuid,
    requested_floor: i32,
    destination_floor: Option<i32>,
    call_time: DateTime<Utc>,
    is_handled: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    id: Uuid,
    elevator_id: Uuid,
    call_id: Uuid,
    assigned_at: DateTime<Utc>,
}

fn floor_from_db(value: i32, column: &str) -> Result<u32, DbError> {
    u32::try_from(value)
        .map_err(|e| DbError::Decode(format!("{column} out of range: {value}: {e}")))
}

fn floor_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn parse_enum<T>(value: &str) -> Result<T, DbError>
where
    T: core::str::FromStr<Err = liftsim_types::UnknownVariant>,
{
    value.parse().map_err(|e: liftsim_types::UnknownVariant| DbError::Decode(e.to_string()))
}

impl TryFrom<BuildingRow> for Building {
    type Error = DbError;

    fn try_from(row: BuildingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BuildingId::from(row.id),
            name: row.name,
            floor_count: floor_from_db(row.floor_count, "floor_count")?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ElevatorRow> for Elevator {
    type Error = DbError;

    fn try_from(row: ElevatorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ElevatorId::from(row.id),
            building_id: BuildingId::from(row.building_id),
            current_floor: floor_from_db(row.current_floor, "current_floor")?,
            status: parse_enum(&row.status)?,
            direction: parse_enum(&row.direction)?,
            door_status: parse_enum(&row.door_status)?,
        })
    }
}

impl TryFrom<ElevatorBuildingRow> for (Elevator, Building) {
    type Error = DbError;

    fn try_from(row: ElevatorBuildingRow) -> Result<Self, Self::Error> {
        let building = Building {
            id: BuildingId::from(row.b_id),
            name: row.b_name,
            floor_count: floor_from_db(row.b_floor_count, "floor_count")?,
            created_at: row.b_created_at,
        };
        let elevator = Elevator {
            id: ElevatorId::from(row.e_id),
            building_id: building.id,
            current_floor: floor_from_db(row.e_current_floor, "current_floor")?,
            status: parse_enum(&row.e_status)?,
            direction: parse_enum(&row.e_direction)?,
            door_status: parse_enum(&row.e_door_status)?,
        };
        Ok((elevator, building))
    }
}

impl TryFrom<CallRow> for Call {
    type Error = DbError;

    fn try_from(row: CallRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CallId::from(row.id),
            building_id: BuildingId::from(row.building_id),
            requested_floor: floor_from_db(row.requested_floor, "requested_floor")?,
            destination_floor: row
                .destination_floor
                .map(|f| floor_from_db(f, "destination_floor"))
                .transpose()?,
            call_time: row.call_time,
            is_handled: row.is_handled,
        })
    }
}

impl From<AssignmentRow> for Assignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            id: row.id.into(),
            elevator_id: row.elevator_id.into(),
            call_id: row.call_id.into(),
            assigned_at: row.assigned_at,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, DbError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const CALL_COLUMNS: &str =
    "id, building_id, requested_floor, destination_floor, call_time, is_handled";

/// Insert attempts for [`EntityStore::insert_hall_call`].
const HALL_CALL_ATTEMPTS: u32 = 3;

const ELEVATOR_COLUMNS: &str = "id, building_id, current_floor, status, direction, door_status";

// ---------------------------------------------------------------------------
// EntityStore
// ---------------------------------------------------------------------------

impl EntityStore for PgStore {
    async fn insert_building(&self, building: &Building, elevator: &Elevator) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO buildings (id, name, floor_count, created_at)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(building.id.into_inner())
        .bind(&building.name)
        .bind(floor_to_db(building.floor_count))
        .bind(building.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"INSERT INTO elevators (id, building_id, current_floor, status, direction, door_status)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(elevator.id.into_inner())
        .bind(elevator.building_id.into_inner())
        .bind(floor_to_db(elevator.current_floor))
        .bind(elevator.status.as_str())
        .bind(elevator.direction.as_str())
        .bind(elevator.door_status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(building_id = %building.id, elevator_id = %elevator.id, "Inserted building");
        Ok(())
    }

    async fn building(&self, id: BuildingId) -> Result<Option<Building>, DbError> {
        sqlx::query_as::<_, BuildingRow>(
            "SELECT id, name, floor_count, created_at FROM buildings WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .map(Building::try_from)
        .transpose()
    }

    async fn elevator(&self, id: ElevatorId) -> Result<Option<Elevator>, DbError> {
        sqlx::query_as::<_, ElevatorRow>(&format!(
            "SELECT {ELEVATOR_COLUMNS} FROM elevators WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .map(Elevator::try_from)
        .transpose()
    }

    async fn elevator_for_building(&self, building_id: BuildingId) -> Result<Option<Elevator>, DbError> {
        sqlx::query_as::<_, ElevatorRow>(&format!(
            "SELECT {ELEVATOR_COLUMNS} FROM elevators WHERE building_id = $1"
        ))
        .bind(building_id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .map(Elevator::try_from)
        .transpose()
    }

    async fn buildings(&self) -> Result<Vec<Building>, DbError> {
        let rows = sqlx::query_as::<_, BuildingRow>(
            "SELECT id, name, floor_count, created_at FROM buildings ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn elevators_with_buildings(&self) -> Result<Vec<(Elevator, Building)>, DbError> {
        let rows = sqlx::query_as::<_, ElevatorBuildingRow>(
            r"SELECT e.id AS e_id, e.current_floor AS e_current_floor, e.status AS e_status,
                     e.direction AS e_direction, e.door_status AS e_door_status,
                     b.id AS b_id, b.name AS b_name, b.floor_count AS b_floor_count,
                     b.created_at AS b_created_at
              FROM elevators e
              JOIN buildings b ON b.id = e.building_id
              ORDER BY e.id",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_call(&self, call: &Call) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO calls (id, building_id, requested_floor, destination_floor, call_time, is_handled)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(call.id.into_inner())
        .bind(call.building_id.into_inner())
        .bind(floor_to_db(call.requested_floor))
        .bind(call.destination_floor.map(floor_to_db))
        .bind(call.call_time)
        .bind(call.is_handled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_hall_call(&self, call: &Call) -> Result<Call, DbError> {
        // `calls_open_hall_idx` allows one open hall call per floor. A
        // conflicting row can be handled between the insert and the
        // lookup, in which case the insert is retried.
        for _ in 0..HALL_CALL_ATTEMPTS {
            let inserted = sqlx::query_as::<_, CallRow>(&format!(
                "INSERT INTO calls (id, building_id, requested_floor, destination_floor, call_time, is_handled)
                 VALUES ($1, $2, $3, NULL, $4, FALSE)
                 ON CONFLICT (building_id, requested_floor)
                     WHERE NOT is_handled AND destination_floor IS NULL
                 DO NOTHING
                 RETURNING {CALL_COLUMNS}"
            ))
            .bind(call.id.into_inner())
            .bind(call.building_id.into_inner())
            .bind(floor_to_db(call.requested_floor))
            .bind(call.call_time)
            .fetch_optional(&self.pool)
            .await?;
            if let Some(row) = inserted {
                return Call::try_from(row);
            }

            let existing = sqlx::query_as::<_, CallRow>(&format!(
                "SELECT {CALL_COLUMNS} FROM calls
                 WHERE building_id = $1 AND requested_floor = $2
                   AND NOT is_handled AND destination_floor IS NULL"
            ))
            .bind(call.building_id.into_inner())
            .bind(floor_to_db(call.requested_floor))
            .fetch_optional(&self.pool)
            .await?;
            if let Some(row) = existing {
                return Call::try_from(row);
            }
        }
        Err(DbError::Unavailable(format!(
            "hall call on floor {} kept conflicting",
            call.requested_floor
        )))
    }

    async fn call(&self, id: CallId) -> Result<Option<Call>, DbError> {
        sqlx::query_as::<_, CallRow>(&format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = $1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?
            .map(Call::try_from)
            .transpose()
    }

    async fn set_call_destination(
        &self,
        id: CallId,
        destination_floor: u32,
    ) -> Result<Option<Call>, DbError> {
        // The handled check lives in the WHERE clause so a tick marking the
        // call handled cannot be overwritten.
        sqlx::query_as::<_, CallRow>(&format!(
            "UPDATE calls SET destination_floor = $2
             WHERE id = $1 AND NOT is_handled
             RETURNING {CALL_COLUMNS}"
        ))
        .bind(id.into_inner())
        .bind(floor_to_db(destination_floor))
        .fetch_optional(&self.pool)
        .await?
        .map(Call::try_from)
        .transpose()
    }

    async fn pending_calls(&self, building_id: BuildingId) -> Result<Vec<Call>, DbError> {
        let rows = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls
             WHERE building_id = $1 AND NOT is_handled
             ORDER BY call_time, id"
        ))
        .bind(building_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn building_calls(&self, building_id: BuildingId) -> Result<Vec<Call>, DbError> {
        let rows = sqlx::query_as::<_, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls
             WHERE building_id = $1
             ORDER BY call_time DESC, id DESC"
        ))
        .bind(building_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn active_assignments(&self, elevator_id: ElevatorId) -> Result<Vec<Assignment>, DbError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r"SELECT a.id, a.elevator_id, a.call_id, a.assigned_at
              FROM call_assignments a
              JOIN calls c ON c.id = a.call_id
              WHERE a.elevator_id = $1 AND NOT c.is_handled
              ORDER BY a.assigned_at, a.id",
        )
        .bind(elevator_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Assignment::from).collect())
    }

    async fn commit_step(&self, commit: &StepCommit) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let elevator = &commit.elevator;

        let updated = sqlx::query(
            r"UPDATE elevators
              SET current_floor = $2, status = $3, direction = $4, door_status = $5
              WHERE id = $1",
        )
        .bind(elevator.id.into_inner())
        .bind(floor_to_db(elevator.current_floor))
        .bind(elevator.status.as_str())
        .bind(elevator.direction.as_str())
        .bind(elevator.door_status.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(DbError::NotFound(format!("elevator {}", elevator.id)));
        }

        if !commit.handled_calls.is_empty() {
            let ids: Vec<Uuid> = commit.handled_calls.iter().map(|c| c.into_inner()).collect();
            let marked = sqlx::query("UPDATE calls SET is_handled = TRUE WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
            let expected = u64::try_from(ids.len()).unwrap_or(u64::MAX);
            if marked.rows_affected() < expected {
                return Err(DbError::NotFound("handled call missing".to_owned()));
            }
        }

        if !commit.assignments.is_empty() {
            let len = commit.assignments.len();
            let mut ids = Vec::with_capacity(len);
            let mut elevator_ids = Vec::with_capacity(len);
            let mut call_ids = Vec::with_capacity(len);
            let mut assigned = Vec::with_capacity(len);
            for a in &commit.assignments {
                ids.push(a.id.into_inner());
                elevator_ids.push(a.elevator_id.into_inner());
                call_ids.push(a.call_id.into_inner());
                assigned.push(a.assigned_at);
            }

            sqlx::query(
                r"INSERT INTO call_assignments (id, elevator_id, call_id, assigned_at)
                  SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::TIMESTAMPTZ[])
                  ON CONFLICT (call_id) DO NOTHING",
            )
            .bind(&ids)
            .bind(&elevator_ids)
            .bind(&call_ids)
            .bind(&assigned)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            elevator_id = %elevator.id,
            handled = commit.handled_calls.len(),
            assignments = commit.assignments.len(),
            "Committed elevator step"
        );
        Ok(())
    }
}
