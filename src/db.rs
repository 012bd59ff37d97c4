use rusqlite::Connection;

/// Open the in-memory store and create the schema.
///
/// Nothing is ever written to disk; every daemon start begins from the demo
/// seed. The connection is handed to the request loop and injected into each
/// handler via AppState.
pub fn open_db() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            title TEXT NOT NULL,
            subject TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            term TEXT NOT NULL,
            frozen INTEGER NOT NULL DEFAULT 0,
            continued_from TEXT,
            FOREIGN KEY(teacher_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_teacher ON courses(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            enrolled_at TEXT NOT NULL,
            UNIQUE(course_id, student_id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            title TEXT NOT NULL,
            instructions TEXT NOT NULL DEFAULT '',
            due_date TEXT,
            points REAL NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_course ON assignments(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            score REAL NOT NULL,
            remark TEXT,
            graded_at TEXT NOT NULL,
            UNIQUE(assignment_id, student_id),
            FOREIGN KEY(assignment_id) REFERENCES assignments(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_assignment ON grades(assignment_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS messages(
            id TEXT PRIMARY KEY,
            sender_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            subject TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            sent_at TEXT NOT NULL,
            read_flag INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(sender_id) REFERENCES users(id),
            FOREIGN KEY(recipient_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS announcements(
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL,
            course_id TEXT,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            posted_at TEXT NOT NULL,
            FOREIGN KEY(author_id) REFERENCES users(id),
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_announcements_course ON announcements(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_records(
            course_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            PRIMARY KEY(course_id, student_id, date),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_course ON attendance_records(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance_records(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS game_rooms(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            host_id TEXT NOT NULL,
            title TEXT NOT NULL,
            join_code TEXT NOT NULL UNIQUE,
            open_flag INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(host_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS game_players(
            room_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            joined_at TEXT NOT NULL,
            score INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY(room_id, user_id),
            FOREIGN KEY(room_id) REFERENCES game_rooms(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_game_players_room ON game_players(room_id)",
        [],
    )?;

    Ok(conn)
}

/// Load the demo fixture set. Ids are fixed so the data is addressable from
/// tests and from a fresh client with no discovery step.
pub fn seed_demo(conn: &Connection) -> anyhow::Result<()> {
    let users: &[(&str, &str, &str, &str, &str)] = &[
        ("u-okafor-a", "Okafor", "Adaeze", "a.okafor@classhub.example", "admin"),
        ("u-reyes-t", "Reyes", "Miguel", "m.reyes@classhub.example", "teacher"),
        ("u-lindqvist-t", "Lindqvist", "Sara", "s.lindqvist@classhub.example", "teacher"),
        ("u-tanaka-s", "Tanaka", "Yuki", "y.tanaka@classhub.example", "student"),
        ("u-osei-s", "Osei", "Kwame", "k.osei@classhub.example", "student"),
        ("u-novak-s", "Novak", "Petra", "p.novak@classhub.example", "student"),
        ("u-haddad-s", "Haddad", "Leila", "l.haddad@classhub.example", "student"),
        ("u-brandt-s", "Brandt", "Jonas", "j.brandt@classhub.example", "student"),
        ("u-gupta-s", "Gupta", "Anika", "a.gupta@classhub.example", "student"),
    ];
    for (id, last, first, email, role) in users {
        conn.execute(
            "INSERT INTO users(id, last_name, first_name, email, role)
             VALUES(?, ?, ?, ?, ?)",
            (id, last, first, email, role),
        )?;
    }

    let courses: &[(&str, &str, &str, &str, &str, &str)] = &[
        ("c-alg2", "MAT201", "Algebra II", "Mathematics", "u-reyes-t", "2025-fall"),
        ("c-bio1", "SCI110", "Biology I", "Science", "u-lindqvist-t", "2025-fall"),
        ("c-hist", "HIS150", "World History", "History", "u-reyes-t", "2025-fall"),
        ("c-lit", "ENG120", "Modern Literature", "English", "u-lindqvist-t", "2025-fall"),
    ];
    for (id, code, title, subject, teacher_id, term) in courses {
        conn.execute(
            "INSERT INTO courses(id, code, title, subject, teacher_id, term)
             VALUES(?, ?, ?, ?, ?, ?)",
            (id, code, title, subject, teacher_id, term),
        )?;
    }

    let enrollments: &[(&str, &str)] = &[
        ("c-alg2", "u-tanaka-s"),
        ("c-alg2", "u-osei-s"),
        ("c-alg2", "u-novak-s"),
        ("c-alg2", "u-haddad-s"),
        ("c-bio1", "u-tanaka-s"),
        ("c-bio1", "u-brandt-s"),
        ("c-bio1", "u-gupta-s"),
        ("c-hist", "u-osei-s"),
        ("c-hist", "u-novak-s"),
        ("c-hist", "u-brandt-s"),
        ("c-lit", "u-haddad-s"),
        ("c-lit", "u-gupta-s"),
    ];
    for (i, (course_id, student_id)) in enrollments.iter().enumerate() {
        conn.execute(
            "INSERT INTO enrollments(id, course_id, student_id, enrolled_at)
             VALUES(?, ?, ?, ?)",
            (format!("e-{:02}", i + 1), course_id, student_id, "2025-09-02"),
        )?;
    }

    let assignments: &[(&str, &str, &str, &str, f64, i64)] = &[
        ("a-alg2-01", "c-alg2", "Quadratic functions worksheet", "2025-09-12", 20.0, 0),
        ("a-alg2-02", "c-alg2", "Factoring quiz", "2025-09-19", 30.0, 1),
        ("a-bio1-01", "c-bio1", "Cell structure lab report", "2025-09-15", 25.0, 0),
        ("a-hist-01", "c-hist", "Primary source analysis", "2025-09-18", 40.0, 0),
        ("a-lit-01", "c-lit", "Short story response", "2025-09-16", 15.0, 0),
    ];
    for (id, course_id, title, due, points, sort) in assignments {
        conn.execute(
            "INSERT INTO assignments(id, course_id, title, due_date, points, sort_order)
             VALUES(?, ?, ?, ?, ?, ?)",
            (id, course_id, title, due, points, sort),
        )?;
    }

    let grades: &[(&str, &str, &str, f64)] = &[
        ("g-01", "a-alg2-01", "u-tanaka-s", 18.0),
        ("g-02", "a-alg2-01", "u-osei-s", 15.5),
        ("g-03", "a-alg2-01", "u-novak-s", 20.0),
        ("g-04", "a-bio1-01", "u-tanaka-s", 22.0),
        ("g-05", "a-bio1-01", "u-brandt-s", 19.5),
        ("g-06", "a-hist-01", "u-osei-s", 33.0),
        ("g-07", "a-lit-01", "u-haddad-s", 13.0),
    ];
    for (id, assignment_id, student_id, score) in grades {
        conn.execute(
            "INSERT INTO grades(id, assignment_id, student_id, score, graded_at)
             VALUES(?, ?, ?, ?, ?)",
            (id, assignment_id, student_id, score, "2025-09-20"),
        )?;
    }

    let messages: &[(&str, &str, &str, &str, &str, &str, i64)] = &[
        (
            "m-01",
            "u-reyes-t",
            "u-tanaka-s",
            "Worksheet feedback",
            "Nice work on the quadratics worksheet. Check question 4 again.",
            "2025-09-13T08:30:00Z",
            1,
        ),
        (
            "m-02",
            "u-tanaka-s",
            "u-reyes-t",
            "Re: Worksheet feedback",
            "Thanks, I see the sign error now.",
            "2025-09-13T15:05:00Z",
            0,
        ),
        (
            "m-03",
            "u-lindqvist-t",
            "u-brandt-s",
            "Lab report due date",
            "Reminder: the cell structure report is due Monday.",
            "2025-09-11T10:00:00Z",
            0,
        ),
    ];
    for (id, sender, recipient, subject, body, sent_at, read_flag) in messages {
        conn.execute(
            "INSERT INTO messages(id, sender_id, recipient_id, subject, body, sent_at, read_flag)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (id, sender, recipient, subject, body, sent_at, read_flag),
        )?;
    }

    let announcements: &[(&str, &str, Option<&str>, &str, &str, &str)] = &[
        (
            "n-01",
            "u-okafor-a",
            None,
            "Picture day",
            "School picture day is Friday, September 26.",
            "2025-09-08T09:00:00Z",
        ),
        (
            "n-02",
            "u-reyes-t",
            Some("c-alg2"),
            "Quiz moved",
            "The factoring quiz moves to Friday the 19th.",
            "2025-09-10T14:20:00Z",
        ),
    ];
    for (id, author, course, title, body, posted_at) in announcements {
        conn.execute(
            "INSERT INTO announcements(id, author_id, course_id, title, body, posted_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (id, author, course, title, body, posted_at),
        )?;
    }

    let attendance: &[(&str, &str, &str, &str)] = &[
        ("c-alg2", "u-tanaka-s", "2025-09-08", "present"),
        ("c-alg2", "u-tanaka-s", "2025-09-09", "late"),
        ("c-alg2", "u-tanaka-s", "2025-09-10", "absent"),
        ("c-alg2", "u-osei-s", "2025-09-08", "present"),
        ("c-alg2", "u-osei-s", "2025-09-09", "present"),
        ("c-alg2", "u-novak-s", "2025-09-08", "excused"),
        ("c-bio1", "u-tanaka-s", "2025-09-08", "present"),
        ("c-bio1", "u-brandt-s", "2025-09-08", "late"),
    ];
    for (course_id, student_id, date, status) in attendance {
        conn.execute(
            "INSERT INTO attendance_records(course_id, student_id, date, status)
             VALUES(?, ?, ?, ?)",
            (course_id, student_id, date, status),
        )?;
    }

    Ok(())
}
