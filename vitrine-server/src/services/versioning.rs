use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Every manual content reassignment and explicit refresh goes through one
/// of these bumps; players compare the counter against the version they
/// last saw. Schedule-driven transitions intentionally do not bump.
pub fn bump_screen(conn: &mut SqliteConnection, screen_id: i32) -> QueryResult<i32> {
    use crate::schema::screens::dsl::*;

    diesel::update(screens.filter(id.eq(screen_id)))
        .set(refresh_version.eq(refresh_version + 1))
        .returning(refresh_version)
        .get_result(conn)
}

/// Mass refresh: bump every screen in a store. Returns how many screens
/// were touched.
pub fn bump_store(conn: &mut SqliteConnection, target_store_id: i32) -> QueryResult<usize> {
    use crate::schema::screens::dsl::*;

    diesel::update(screens.filter(store_id.eq(target_store_id)))
        .set(refresh_version.eq(refresh_version + 1))
        .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    #[test]
    fn bumps_are_monotonic() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");

        assert_eq!(bump_screen(&mut conn, fx.screen.id).unwrap(), 1);
        assert_eq!(bump_screen(&mut conn, fx.screen.id).unwrap(), 2);
    }

    #[test]
    fn store_bump_touches_every_screen_in_the_store() {
        let mut conn = test_conn();
        let fx = fixture(&mut conn, "UTC");
        let second = add_screen(&mut conn, fx.store_id, "Checkout", "tok-checkout");

        assert_eq!(bump_store(&mut conn, fx.store_id).unwrap(), 2);
        assert_eq!(bump_screen(&mut conn, second.id).unwrap(), 2);
    }
}
