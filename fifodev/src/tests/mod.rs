mod mode_tests;
