/// Table and index definitions, applied in order at startup
pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE COLLATE NOCASE,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        username TEXT NOT NULL COLLATE NOCASE,
        email TEXT NOT NULL COLLATE NOCASE,
        display_name TEXT,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'member',
        is_active INTEGER NOT NULL DEFAULT 1,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        UNIQUE (site_id, username),
        UNIQUE (site_id, email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS external_identities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        provider_user_id TEXT NOT NULL,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        user_id INTEGER NOT NULL REFERENCES users(id),
        created_by INTEGER,
        created_at TEXT NOT NULL,
        UNIQUE (provider_user_id, site_id),
        UNIQUE (site_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        name TEXT NOT NULL,
        color TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spaces (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        name TEXT NOT NULL,
        description TEXT,
        color TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        category_id INTEGER REFERENCES categories(id),
        space_id INTEGER REFERENCES spaces(id),
        name TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'planning',
        start_date TEXT,
        end_date TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS phases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        project_id INTEGER NOT NULL REFERENCES projects(id),
        name TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        start_date TEXT,
        end_date TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        project_id INTEGER REFERENCES projects(id),
        phase_id INTEGER REFERENCES phases(id),
        parent_task_id INTEGER REFERENCES tasks(id),
        assignee_id INTEGER REFERENCES users(id),
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'todo',
        priority TEXT NOT NULL DEFAULT 'medium',
        progress INTEGER NOT NULL DEFAULT 0,
        start_date TEXT,
        due_date TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        task_id INTEGER REFERENCES tasks(id),
        title TEXT NOT NULL,
        description TEXT,
        location TEXT,
        start_at TEXT NOT NULL,
        end_at TEXT NOT NULL,
        all_day INTEGER NOT NULL DEFAULT 0,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        task_id INTEGER NOT NULL REFERENCES tasks(id),
        body TEXT NOT NULL,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        company TEXT,
        address TEXT,
        notes TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        customer_id INTEGER REFERENCES customers(id),
        first_name TEXT NOT NULL,
        last_name TEXT,
        email TEXT,
        phone TEXT,
        position TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS deals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        customer_id INTEGER REFERENCES customers(id),
        contact_id INTEGER REFERENCES contacts(id),
        title TEXT NOT NULL,
        value REAL NOT NULL DEFAULT 0,
        stage TEXT NOT NULL DEFAULT 'lead',
        probability INTEGER NOT NULL DEFAULT 0,
        expected_close_date TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quotes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL REFERENCES sites(id),
        deal_id INTEGER REFERENCES deals(id),
        customer_id INTEGER REFERENCES customers(id),
        quote_number TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft',
        valid_until TEXT,
        notes TEXT,
        created_by INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        UNIQUE (site_id, quote_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quote_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        quote_id INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
        description TEXT NOT NULL,
        quantity REAL NOT NULL,
        unit_price REAL NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_site ON users(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_external_identities_provider ON external_identities(provider_user_id)",
    "CREATE INDEX IF NOT EXISTS idx_categories_site ON categories(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_spaces_site ON spaces(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_projects_site ON projects(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_phases_project ON phases(site_id, project_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(site_id, project_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(site_id, parent_task_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_range ON events(site_id, start_at, end_at)",
    "CREATE INDEX IF NOT EXISTS idx_comments_task ON comments(site_id, task_id)",
    "CREATE INDEX IF NOT EXISTS idx_customers_site ON customers(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_contacts_customer ON contacts(site_id, customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_deals_customer ON deals(site_id, customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_quotes_site ON quotes(site_id)",
    "CREATE INDEX IF NOT EXISTS idx_quote_items_quote ON quote_items(quote_id)",
];
