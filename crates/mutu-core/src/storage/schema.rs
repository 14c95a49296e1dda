pub(super) const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS units (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS study_programs (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    unit_id TEXT REFERENCES units(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS academic_years (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS accreditation_periods (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    program TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    status TEXT NOT NULL,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_periods_status ON accreditation_periods(status);

CREATE TABLE IF NOT EXISTS criteria (
    id TEXT PRIMARY KEY,
    kode TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    parent_id TEXT REFERENCES criteria(id),
    period_id TEXT REFERENCES accreditation_periods(id) ON DELETE SET NULL,
    weight REAL,
    display_order INTEGER NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_criteria_parent ON criteria(parent_id);
CREATE INDEX IF NOT EXISTS idx_criteria_period ON criteria(period_id);

CREATE TABLE IF NOT EXISTS criterion_submissions (
    id TEXT PRIMARY KEY,
    period_id TEXT NOT NULL REFERENCES accreditation_periods(id),
    criterion_id TEXT NOT NULL REFERENCES criteria(id),
    content TEXT,
    form_data TEXT NOT NULL,
    status TEXT NOT NULL,
    is_complete INTEGER NOT NULL DEFAULT 0,
    completion_percentage REAL NOT NULL DEFAULT 0,
    notes TEXT,
    submitted_by TEXT,
    submitted_at TEXT,
    reviewed_by TEXT,
    reviewed_at TEXT,
    approved_by TEXT,
    approved_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (period_id, criterion_id)
);

CREATE INDEX IF NOT EXISTS idx_submissions_status ON criterion_submissions(status);

CREATE TABLE IF NOT EXISTS criterion_mapping_versions (
    criterion_id TEXT PRIMARY KEY REFERENCES criteria(id) ON DELETE CASCADE,
    version INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS butir_column_mappings (
    id TEXT PRIMARY KEY,
    criterion_id TEXT NOT NULL REFERENCES criteria(id) ON DELETE CASCADE,
    version INTEGER NOT NULL,
    field_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    field_type TEXT NOT NULL,
    field_config TEXT NOT NULL,
    display_order INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (criterion_id, field_name),
    UNIQUE (criterion_id, column_name)
);

CREATE TABLE IF NOT EXISTS butir_data (
    id TEXT PRIMARY KEY,
    criterion_id TEXT NOT NULL REFERENCES criteria(id),
    submission_id TEXT NOT NULL REFERENCES criterion_submissions(id) ON DELETE CASCADE,
    row_number INTEGER NOT NULL,
    mapping_version INTEGER NOT NULL,
    c1 TEXT, c2 TEXT, c3 TEXT, c4 TEXT, c5 TEXT, c6 TEXT, c7 TEXT, c8 TEXT, c9 TEXT, c10 TEXT,
    c11 TEXT, c12 TEXT, c13 TEXT, c14 TEXT, c15 TEXT, c16 TEXT, c17 TEXT, c18 TEXT, c19 TEXT, c20 TEXT,
    c21 TEXT, c22 TEXT, c23 TEXT, c24 TEXT, c25 TEXT, c26 TEXT, c27 TEXT, c28 TEXT, c29 TEXT, c30 TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_butir_data_criterion ON butir_data(criterion_id);
CREATE INDEX IF NOT EXISTS idx_butir_data_submission ON butir_data(submission_id, row_number);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    submission_id TEXT NOT NULL REFERENCES criterion_submissions(id),
    original_name TEXT NOT NULL,
    mime_type TEXT,
    size INTEGER NOT NULL,
    path TEXT NOT NULL UNIQUE,
    uploaded_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_submission ON documents(submission_id);

CREATE TABLE IF NOT EXISTS audit_plans (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    year INTEGER NOT NULL,
    scope TEXT,
    status TEXT NOT NULL,
    approved_by TEXT,
    approved_at TEXT,
    completed_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_schedules (
    id TEXT PRIMARY KEY,
    plan_id TEXT NOT NULL REFERENCES audit_plans(id) ON DELETE CASCADE,
    unit TEXT NOT NULL,
    scheduled_date TEXT NOT NULL,
    auditor_id TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_schedules_plan ON audit_schedules(plan_id);

CREATE TABLE IF NOT EXISTS audit_findings (
    id TEXT PRIMARY KEY,
    finding_code TEXT NOT NULL UNIQUE,
    audit_plan_id TEXT REFERENCES audit_plans(id),
    unit TEXT,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    due_date TEXT NOT NULL,
    resolution_notes TEXT,
    resolved_at TEXT,
    verified_by TEXT,
    verified_at TEXT,
    closed_by TEXT,
    closed_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_findings_status ON audit_findings(status);
CREATE INDEX IF NOT EXISTS idx_findings_due ON audit_findings(due_date);

CREATE TABLE IF NOT EXISTS rtls (
    id TEXT PRIMARY KEY,
    rtl_code TEXT NOT NULL UNIQUE,
    finding_id TEXT NOT NULL UNIQUE REFERENCES audit_findings(id),
    action_plan TEXT NOT NULL,
    pic_id TEXT,
    target_date TEXT,
    status TEXT NOT NULL,
    completion_percentage REAL NOT NULL DEFAULT 0,
    verification_status TEXT NOT NULL,
    verification_notes TEXT,
    verified_by TEXT,
    verified_at TEXT,
    started_at TEXT,
    completed_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rtls_status ON rtls(status);

CREATE TABLE IF NOT EXISTS rtms (
    id TEXT PRIMARY KEY,
    rtm_code TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    meeting_date TEXT NOT NULL,
    agenda TEXT,
    status TEXT NOT NULL,
    decisions TEXT,
    minutes TEXT,
    chair_id TEXT,
    started_at TEXT,
    completed_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rtm_action_items (
    id TEXT PRIMARY KEY,
    action_code TEXT NOT NULL UNIQUE,
    rtm_id TEXT NOT NULL REFERENCES rtms(id),
    description TEXT NOT NULL,
    pic_id TEXT,
    due_date TEXT,
    status TEXT NOT NULL,
    completion_percentage REAL NOT NULL DEFAULT 0,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_action_items_rtm ON rtm_action_items(rtm_id);

CREATE TABLE IF NOT EXISTS spmi_standards (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    statement TEXT,
    status TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    approved_by TEXT,
    approved_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS spmi_indicators (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    standard_id TEXT NOT NULL REFERENCES spmi_standards(id),
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    target_value REAL NOT NULL,
    unit TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_indicators_standard ON spmi_indicators(standard_id);

CREATE TABLE IF NOT EXISTS indicator_monitorings (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    indicator_id TEXT NOT NULL REFERENCES spmi_indicators(id) ON DELETE CASCADE,
    period_label TEXT NOT NULL,
    target_value REAL NOT NULL,
    actual_value REAL NOT NULL,
    achievement REAL NOT NULL,
    attention TEXT NOT NULL,
    notes TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_monitorings_indicator ON indicator_monitorings(indicator_id);

CREATE TABLE IF NOT EXISTS surveys (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    published_at TEXT,
    closed_at TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS survey_questions (
    id TEXT PRIMARY KEY,
    survey_id TEXT NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    question_type TEXT NOT NULL,
    options TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0,
    display_order INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_survey ON survey_questions(survey_id);

CREATE TABLE IF NOT EXISTS survey_responses (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    survey_id TEXT NOT NULL REFERENCES surveys(id) ON DELETE CASCADE,
    respondent_id TEXT,
    answers TEXT NOT NULL,
    submitted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_survey ON survey_responses(survey_id);
"#;
